#[macro_use]
extern crate deploy_system_kit;

pub mod deployments;
pub mod frontend;
pub mod generate;
