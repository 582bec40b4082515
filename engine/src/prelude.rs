pub use crate::{
    math::statistics::*,
    models::{gbm::*, montecarloengine::*, parameters::*, summary::*},
    utils::errors::*,
};
