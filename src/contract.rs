use crate::models::ActivityRecord;
use ethers::contract::abigen;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, U256};
use serde::Serialize;
use std::sync::Arc;

abigen!(
    DeadManSwitch,
    r#"[
        function deposit(address _receiver, uint256 _inactivityPeriod) payable returns (bytes32)
        function updateActivity(bytes32 _lockId)
        function releaseFunds(bytes32 _lockId, uint256 _senderLastTxTimestamp)
        function cancelLock(bytes32 _lockId)
        function getDeadLockView(bytes32 _lockId) view returns (address, address, uint256, uint256, uint256, bool, bool, string, string)
        function getTimeUntilReleaseView(bytes32 _lockId) view returns (uint256)
        function getTimeSinceLastActivityView(bytes32 _lockId) view returns (uint256)
        function simulateActivityUpdate(bytes32 _lockId, uint256 _senderLastTxTimestamp) view returns (uint256, bool)
        function getUserLocks(address _user) view returns (bytes32[])
        function getContractBalance() view returns (uint256)
        event DeadLockCreated(bytes32 indexed lockId, address indexed sender, address indexed receiver, uint256 amount, uint256 inactivityPeriod, uint256 lastActivityTime, string senderChain)
    ]"#
);

pub type LockId = [u8; 32];

pub fn parse_lock_id(raw: &str) -> Result<LockId, anyhow::Error> {
    let stripped = raw.strip_prefix("0x").unwrap_or(raw);
    let bytes = hex::decode(stripped)
        .map_err(|e| anyhow::anyhow!("Lock id is not valid hex: {}", e))?;
    if bytes.len() != 32 {
        return Err(anyhow::anyhow!(
            "Lock id must be 32 bytes, got {}",
            bytes.len()
        ));
    }
    let mut id = [0u8; 32];
    id.copy_from_slice(&bytes);
    Ok(id)
}

pub fn encode_lock_id(id: LockId) -> String {
    format!("0x{}", hex::encode(id))
}

/// The timestamp handed to releaseFunds: a fresh observation from the
/// activity providers when one is usable, otherwise the lock's own on-chain
/// last-activity time. A zero timestamp (not-found, or a record without a
/// usable block time) never reaches the contract.
pub fn release_timestamp_hint(record: &ActivityRecord, on_chain_last_activity: u64) -> u64 {
    if record.found && record.timestamp_unix > 0 {
        record.timestamp_unix
    } else {
        on_chain_last_activity
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockDetails {
    pub sender: String,
    pub receiver: String,
    pub amount_wei: String,
    pub last_activity_time: u64,
    pub inactivity_period: u64,
    pub funds_released: bool,
    pub cancelled: bool,
    pub sender_chain: String,
    pub receiver_chain: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySimulation {
    pub new_activity_time: u64,
    pub would_update: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLockOutcome {
    pub tx_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_id: Option<String>,
}

type ReadContract = DeadManSwitch<Provider<Http>>;
type WriteContract = DeadManSwitch<SignerMiddleware<Provider<Http>, LocalWallet>>;

/// Typed client over the on-chain Dead Man Switch contract. Reads only need
/// an RPC endpoint; writes additionally need a signer key.
pub struct LockClient {
    reader: ReadContract,
    writer: Option<WriteContract>,
}

impl LockClient {
    pub async fn connect(
        rpc_url: &str,
        contract_address: &str,
        signer_key: Option<&str>,
    ) -> Result<Self, anyhow::Error> {
        let provider = Provider::<Http>::try_from(rpc_url)?;
        let address: Address = contract_address
            .parse()
            .map_err(|e| anyhow::anyhow!("Bad contract address '{}': {}", contract_address, e))?;
        let reader = DeadManSwitch::new(address, Arc::new(provider.clone()));

        let writer = match signer_key {
            Some(key) => {
                let chain_id = provider.get_chainid().await?.as_u64();
                let wallet: LocalWallet = key
                    .parse::<LocalWallet>()
                    .map_err(|e| anyhow::anyhow!("Bad signer key: {}", e))?
                    .with_chain_id(chain_id);
                let middleware = SignerMiddleware::new(provider, wallet);
                Some(DeadManSwitch::new(address, Arc::new(middleware)))
            }
            None => None,
        };

        Ok(Self { reader, writer })
    }

    fn writer(&self) -> Result<&WriteContract, anyhow::Error> {
        self.writer
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("No signer configured, write operations are disabled"))
    }

    pub fn can_write(&self) -> bool {
        self.writer.is_some()
    }

    pub async fn lock_details(&self, lock_id: LockId) -> Result<LockDetails, anyhow::Error> {
        let (
            sender,
            receiver,
            amount,
            last_activity_time,
            inactivity_period,
            funds_released,
            cancelled,
            sender_chain,
            receiver_chain,
        ) = self.reader.get_dead_lock_view(lock_id).call().await?;

        Ok(LockDetails {
            sender: format!("{:#x}", sender),
            receiver: format!("{:#x}", receiver),
            amount_wei: amount.to_string(),
            last_activity_time: last_activity_time.as_u64(),
            inactivity_period: inactivity_period.as_u64(),
            funds_released,
            cancelled,
            sender_chain,
            receiver_chain,
        })
    }

    /// Seconds until the lock becomes releasable; zero means eligible now.
    pub async fn time_until_release(&self, lock_id: LockId) -> Result<u64, anyhow::Error> {
        let t = self
            .reader
            .get_time_until_release_view(lock_id)
            .call()
            .await?;
        Ok(t.as_u64())
    }

    pub async fn time_since_activity(&self, lock_id: LockId) -> Result<u64, anyhow::Error> {
        let t = self
            .reader
            .get_time_since_last_activity_view(lock_id)
            .call()
            .await?;
        Ok(t.as_u64())
    }

    pub async fn simulate_activity_update(
        &self,
        lock_id: LockId,
        candidate_timestamp: u64,
    ) -> Result<ActivitySimulation, anyhow::Error> {
        let (new_activity_time, would_update) = self
            .reader
            .simulate_activity_update(lock_id, U256::from(candidate_timestamp))
            .call()
            .await?;
        Ok(ActivitySimulation {
            new_activity_time: new_activity_time.as_u64(),
            would_update,
        })
    }

    pub async fn user_locks(&self, user: &str) -> Result<Vec<LockId>, anyhow::Error> {
        let address: Address = user
            .parse()
            .map_err(|e| anyhow::anyhow!("Bad wallet address '{}': {}", user, e))?;
        Ok(self.reader.get_user_locks(address).call().await?)
    }

    pub async fn contract_balance(&self) -> Result<String, anyhow::Error> {
        let balance = self.reader.get_contract_balance().call().await?;
        Ok(balance.to_string())
    }

    pub async fn create_lock(
        &self,
        receiver: &str,
        inactivity_period_secs: u64,
        value_wei: &str,
    ) -> Result<CreateLockOutcome, anyhow::Error> {
        let receiver: Address = receiver
            .parse()
            .map_err(|e| anyhow::anyhow!("Bad receiver address '{}': {}", receiver, e))?;
        let value = U256::from_dec_str(value_wei)
            .map_err(|e| anyhow::anyhow!("Bad wei amount '{}': {}", value_wei, e))?;

        let call = self
            .writer()?
            .deposit(receiver, U256::from(inactivity_period_secs))
            .value(value);
        let pending = call.send().await?;
        let receipt = pending
            .await?
            .ok_or_else(|| anyhow::anyhow!("Deposit transaction dropped from the mempool"))?;

        // The lock id only exists in the DeadLockCreated event.
        let lock_id = receipt
            .logs
            .iter()
            .find_map(|log| {
                ethers::contract::parse_log::<DeadLockCreatedFilter>(log.clone()).ok()
            })
            .map(|event| encode_lock_id(event.lock_id));

        Ok(CreateLockOutcome {
            tx_hash: format!("{:#x}", receipt.transaction_hash),
            lock_id,
        })
    }

    pub async fn ping(&self, lock_id: LockId) -> Result<String, anyhow::Error> {
        let call = self.writer()?.update_activity(lock_id);
        let pending = call.send().await?;
        let receipt = pending
            .await?
            .ok_or_else(|| anyhow::anyhow!("Activity update transaction dropped"))?;
        Ok(format!("{:#x}", receipt.transaction_hash))
    }

    pub async fn release(
        &self,
        lock_id: LockId,
        last_tx_timestamp: u64,
    ) -> Result<String, anyhow::Error> {
        let call = self
            .writer()?
            .release_funds(lock_id, U256::from(last_tx_timestamp));
        let pending = call.send().await?;
        let receipt = pending
            .await?
            .ok_or_else(|| anyhow::anyhow!("Release transaction dropped"))?;
        Ok(format!("{:#x}", receipt.transaction_hash))
    }

    pub async fn cancel(&self, lock_id: LockId) -> Result<String, anyhow::Error> {
        let call = self.writer()?.cancel_lock(lock_id);
        let pending = call.send().await?;
        let receipt = pending
            .await?
            .ok_or_else(|| anyhow::anyhow!("Cancel transaction dropped"))?;
        Ok(format!("{:#x}", receipt.transaction_hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityQuery, ActivityRecord, ChainId, NetworkTag};

    fn query() -> ActivityQuery {
        ActivityQuery {
            chain: ChainId::Ethereum,
            network: NetworkTag::Testnet,
            address: "0xb1C0fd1C9e63E12eb669eF2136F7727F035717b4".to_string(),
        }
    }

    #[test]
    fn lock_id_round_trips() {
        let raw = format!("0x{}", "ab".repeat(32));
        let id = parse_lock_id(&raw).unwrap();
        assert_eq!(encode_lock_id(id), raw);
        // Without the prefix too.
        assert_eq!(parse_lock_id(&"ab".repeat(32)).unwrap(), id);
    }

    #[test]
    fn lock_id_rejects_bad_input() {
        assert!(parse_lock_id("0x1234").is_err());
        assert!(parse_lock_id("not-hex").is_err());
        assert!(parse_lock_id(&"ab".repeat(33)).is_err());
    }

    #[test]
    fn fresh_activity_wins_over_on_chain_time() {
        let record = ActivityRecord {
            timestamp_unix: 1_700_000_000,
            ..ActivityRecord::not_found(&query(), "")
        };
        let record = ActivityRecord {
            found: true,
            message: None,
            ..record
        };
        assert_eq!(release_timestamp_hint(&record, 1_600_000_000), 1_700_000_000);
    }

    #[test]
    fn missing_activity_falls_back_to_on_chain_time() {
        let record = ActivityRecord::not_found(&query(), "No transactions found");
        assert_eq!(release_timestamp_hint(&record, 1_600_000_000), 1_600_000_000);
    }

    #[test]
    fn zero_timestamp_activity_falls_back_to_on_chain_time() {
        // A found record without a usable block time must not reach the
        // contract as timestamp zero.
        let mut record = ActivityRecord::not_found(&query(), "");
        record.found = true;
        record.message = None;
        record.tx_reference = Some("sig".to_string());
        assert_eq!(release_timestamp_hint(&record, 1_600_000_000), 1_600_000_000);
    }
}
