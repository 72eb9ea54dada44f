// ============ Deployment Records ============
// Where each compiled script lives on-chain, stored as pretty JSON with
// hex-encoded hashes so the file can be checked in next to the binaries.

use std::collections::BTreeMap;

use rce_types::{blake2b_256, HASH_TYPE_DATA, HASH_TYPE_DATA1, HASH_TYPE_DATA2, HASH_TYPE_TYPE};
use serde::{Deserialize, Serialize};

use crate::SdkError;

pub const RC_LOCK: &str = "rc-lock";
pub const RCE_VALIDATOR: &str = "rce-validator";
pub const XUDT_RCE: &str = "xudt-rce";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentInfo {
    pub network: String,
    pub scripts: BTreeMap<String, ScriptDeployment>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptDeployment {
    pub description: String,
    pub code_hash: String,
    pub binary_size: usize,
    pub hash_type: String,
    pub cell_tx_hash: String,
    pub cell_index: u32,
}

impl DeploymentInfo {
    pub fn new(network: &str) -> Self {
        Self {
            network: network.to_string(),
            scripts: BTreeMap::new(),
        }
    }

    /// Record a binary referenced by data hash
    pub fn add_binary(&mut self, name: &str, description: &str, binary: &[u8]) {
        let code_hash = blake2b_256(binary);
        self.scripts.insert(
            name.to_string(),
            ScriptDeployment {
                description: description.to_string(),
                code_hash: format!("0x{}", hex::encode(code_hash)),
                binary_size: binary.len(),
                hash_type: "data1".to_string(),
                cell_tx_hash: format!("0x{}", "00".repeat(32)),
                cell_index: 0,
            },
        );
    }

    /// Point `name` at the cell carrying its binary
    pub fn set_cell(&mut self, name: &str, tx_hash: &[u8; 32], index: u32) -> Result<(), SdkError> {
        let script = self
            .scripts
            .get_mut(name)
            .ok_or_else(|| SdkError::UnknownScript(name.to_string()))?;
        script.cell_tx_hash = format!("0x{}", hex::encode(tx_hash));
        script.cell_index = index;
        Ok(())
    }

    fn script(&self, name: &str) -> Result<&ScriptDeployment, SdkError> {
        self.scripts
            .get(name)
            .ok_or_else(|| SdkError::UnknownScript(name.to_string()))
    }

    pub fn code_hash(&self, name: &str) -> Result<[u8; 32], SdkError> {
        decode_hash(&self.script(name)?.code_hash)
    }

    pub fn hash_type(&self, name: &str) -> Result<u8, SdkError> {
        match self.script(name)?.hash_type.as_str() {
            "data" => Ok(HASH_TYPE_DATA),
            "type" => Ok(HASH_TYPE_TYPE),
            "data1" => Ok(HASH_TYPE_DATA1),
            "data2" => Ok(HASH_TYPE_DATA2),
            other => Err(SdkError::InvalidHashType(other.to_string())),
        }
    }

    pub fn to_json(&self) -> Result<String, SdkError> {
        serde_json::to_string_pretty(self).map_err(|e| SdkError::Json(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, SdkError> {
        serde_json::from_str(json).map_err(|e| SdkError::Json(e.to_string()))
    }
}

fn decode_hash(text: &str) -> Result<[u8; 32], SdkError> {
    let digits = text.strip_prefix("0x").unwrap_or(text);
    let bytes = hex::decode(digits).map_err(|_| SdkError::InvalidHex(text.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| SdkError::InvalidHex(text.to_string()))
}

// ============ Tests ============
