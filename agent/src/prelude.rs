pub use crate::{
    agent::*,
    callback::*,
    chat::*,
    config::*,
    coordinator::*,
    identity::*,
    messages::*,
    transport::*,
    utils::errors::*,
};
