mod driver;
mod helpers;
mod recovery;
mod sequencing;
