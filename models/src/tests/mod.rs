mod rail;
mod state;
mod wire;
