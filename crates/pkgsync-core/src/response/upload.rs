//! JSON acknowledgement returned by upload, replicate and build commands.

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    pub success: bool,
    #[serde(rename = "msg", alias = "message")]
    pub message: String,
    /// Remote path of the package; replicate answers leave it out
    #[serde(default)]
    pub path: String,
}

impl UploadResult {
    /// Decode an acknowledgement; `success` and `msg` are required.
    pub fn from_json(json: &str) -> Result<Self, SyncError> {
        serde_json::from_str(json).map_err(|e| SyncError::malformed("acknowledgement", e))
    }

    /// Decode an upload acknowledgement, which must also name the remote path
    /// when successful.
    pub fn upload_from_json(json: &str) -> Result<Self, SyncError> {
        let result = Self::from_json(json)?;
        if result.success && result.path.trim().is_empty() {
            return Err(SyncError::malformed(
                "upload",
                "successful upload without package path",
            ));
        }
        Ok(result)
    }
}
