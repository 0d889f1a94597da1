use anyhow::{
    Context,
    Result,
    anyhow,
};
use chrono::Utc;
use serde::{
    Deserialize,
    Serialize,
};
use sha2::{
    Digest,
    Sha256,
};
use std::{
    fmt,
    fs,
    path::{
        Path,
        PathBuf,
    },
};

pub const DEPLOYMENTS_ROOT: &str = ".deployments";
const DEPLOYMENTS_FILE: &str = "deployments.json";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeploymentEnv {
    /// A local anvil/hardhat node.
    Local,
    /// Flow EVM testnet.
    Test,
}

impl DeploymentEnv {
    pub const ALL: [DeploymentEnv; 2] = [DeploymentEnv::Local, DeploymentEnv::Test];

    pub fn dir_name(self) -> &'static str {
        match self {
            DeploymentEnv::Local => "local",
            DeploymentEnv::Test => "test",
        }
    }

    pub fn default_network_url(self) -> &'static str {
        match self {
            DeploymentEnv::Local => "http://127.0.0.1:8545",
            DeploymentEnv::Test => "https://testnet.evm.nodes.onflow.org",
        }
    }

    pub fn default_chain_id(self) -> u64 {
        match self {
            DeploymentEnv::Local => 31337,
            DeploymentEnv::Test => 545,
        }
    }

    pub fn currency_symbol(self) -> &'static str {
        match self {
            DeploymentEnv::Local => "ETH",
            DeploymentEnv::Test => "FLOW",
        }
    }
}

impl fmt::Display for DeploymentEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeploymentEnv::Local => "Local",
            DeploymentEnv::Test => "Testnet",
        };
        write!(f, "{name}")
    }
}

/// The one table contract the dealer plays against in an environment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub registered_at: String,
    pub contract_address: String,
    pub network_url: String,
    pub chain_id: u64,
    pub currency_symbol: String,
    pub abi_hash: String,
    #[serde(default)]
    pub deployment_block_height: Option<u64>,
}

impl DeploymentRecord {
    pub fn is_compatible_with_hash(&self, hash: &str) -> bool {
        self.abi_hash == hash
    }
}

#[derive(Debug)]
pub struct DeploymentStore {
    path: PathBuf,
}

impl DeploymentStore {
    pub fn new(env: DeploymentEnv) -> Result<Self> {
        Self::in_root(DEPLOYMENTS_ROOT, env)
    }

    pub fn in_root(root: impl AsRef<Path>, env: DeploymentEnv) -> Result<Self> {
        let path = ensure_store(root.as_ref(), env)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<DeploymentRecord>> {
        read_record(&self.path)
    }

    pub fn save(&self, record: &DeploymentRecord) -> Result<()> {
        write_record(&self.path, record)
    }
}

/// Fingerprint of the ABI text the bindings were generated from.
pub fn compute_abi_hash(abi_json: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(abi_json.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn ensure_structure() -> Result<()> {
    for env in DeploymentEnv::ALL {
        let _ = ensure_store(Path::new(DEPLOYMENTS_ROOT), env)?;
    }
    Ok(())
}

fn ensure_store(root: &Path, env: DeploymentEnv) -> Result<PathBuf> {
    let env_dir = root.join(env.dir_name());
    if !env_dir.exists() {
        fs::create_dir_all(&env_dir).with_context(|| {
            format!("Failed to create deployments directory {}", env_dir.display())
        })?;
    }

    let file_path = env_dir.join(DEPLOYMENTS_FILE);
    if !file_path.exists() {
        fs::write(&file_path, b"").with_context(|| {
            format!(
                "Failed to create deployment record file for {} at {:?}",
                env, file_path
            )
        })?;
    }

    Ok(file_path)
}

fn read_record(path: impl AsRef<Path>) -> Result<Option<DeploymentRecord>> {
    let data = fs::read(path.as_ref()).context("Failed to read deployment records")?;
    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice::<DeploymentRecord>(&data).map(Some).map_err(|e| {
        anyhow!("Failed to parse deployment record JSON; expected a single deployment object: {e}")
    })
}

fn write_record(path: impl AsRef<Path>, record: &DeploymentRecord) -> Result<()> {
    let json = serde_json::to_vec_pretty(record)
        .context("Failed to serialize deployment record")?;
    fs::write(path.as_ref(), json).context("Failed to write deployment record")?;
    Ok(())
}

/// Registers an already deployed table contract for `env`, replacing any
/// previous record.
pub fn record_deployment(
    store: &DeploymentStore,
    env: DeploymentEnv,
    contract_address: impl AsRef<str>,
    network_url: impl AsRef<str>,
    chain_id: u64,
    abi_hash: impl AsRef<str>,
    deployment_block_height: Option<u64>,
) -> Result<DeploymentRecord> {
    let record = DeploymentRecord {
        registered_at: Utc::now().to_rfc3339(),
        contract_address: contract_address.as_ref().to_string(),
        network_url: network_url.as_ref().to_string(),
        chain_id,
        currency_symbol: env.currency_symbol().to_string(),
        abi_hash: abi_hash.as_ref().to_string(),
        deployment_block_height,
    };
    store.save(&record)?;
    Ok(record)
}
