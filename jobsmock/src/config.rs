/// Settings for a single registry instance.
#[derive(Clone, Debug)]
pub struct RegistryConfig {
    /// Bound on queued requests waiting for the registry task.
    pub message_capacity: usize,
    /// Attribution stamped on every created record.
    pub creator: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            message_capacity: 32,
            creator: "test".to_string(),
        }
    }
}

impl RegistryConfig {
    pub fn with_message_capacity(mut self, message_capacity: usize) -> Self {
        self.message_capacity = message_capacity;
        self
    }

    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = creator.into();
        self
    }
}
