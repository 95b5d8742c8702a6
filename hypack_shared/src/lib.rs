mod identifier;

pub use identifier::*;

pub use byteorder;
pub use chrono;
pub use crossbeam_channel;
pub use log;
pub use rand;
pub use serde_json;
pub use sha2;
pub use thiserror;
