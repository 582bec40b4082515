pub mod gbm;
pub mod montecarloengine;
pub mod parameters;
pub mod summary;
