use std::collections::HashMap;

pub type JobId = String;
pub type Program = String;
pub type Args = Vec<String>;
pub type Envs = HashMap<String, String>;
pub type Labels = HashMap<String, String>;
pub type OutputBlob = bytes::Bytes;
