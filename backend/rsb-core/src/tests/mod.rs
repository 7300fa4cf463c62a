mod config;
mod control;
mod helpers;
mod protocol;
mod session;
