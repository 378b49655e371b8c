mod binutils;
mod bot;
mod botlib;
mod cmds;
mod config;
mod db;

pub use botlib::{Command, Context, Data, Error};

#[tokio::main]
async fn main() {
    cmds::cmd_loader().await;
}
