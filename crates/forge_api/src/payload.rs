/// Query parameters for `/forge/stream`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub intent: String,
    pub from_address: String,
    pub rpc_url: String,
    /// Client-proposed session label; the backend generates one when absent.
    pub session_id: Option<String>,
}

impl StreamRequest {
    pub fn new(
        intent: impl Into<String>,
        from_address: impl Into<String>,
        rpc_url: impl Into<String>,
    ) -> Self {
        Self {
            intent: intent.into(),
            from_address: from_address.into(),
            rpc_url: rpc_url.into(),
            session_id: None,
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = vec![
            ("intent", self.intent.as_str()),
            ("from_address", self.from_address.as_str()),
            ("rpc_url", self.rpc_url.as_str()),
        ];
        if let Some(session_id) = self.session_id.as_deref() {
            pairs.push(("session_id", session_id));
        }
        pairs
    }
}

/// Query parameters for `/forge/fix`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixRequest {
    /// Content of the failing step.
    pub error: String,
    pub rpc_url: String,
    /// Session token captured from the original stream.
    pub temp_dir: String,
}

impl FixRequest {
    pub fn new(
        error: impl Into<String>,
        rpc_url: impl Into<String>,
        temp_dir: impl Into<String>,
    ) -> Self {
        Self {
            error: error.into(),
            rpc_url: rpc_url.into(),
            temp_dir: temp_dir.into(),
        }
    }

    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("error", self.error.as_str()),
            ("rpc_url", self.rpc_url.as_str()),
            ("temp_dir", self.temp_dir.as_str()),
        ]
    }
}
