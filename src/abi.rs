//! Contract bindings and runtime call encoding.
//!
//! The storage, ERC-20 and NFT functions the Ethereum adapter calls are
//! bound at compile time with `sol!`. `send_function` and `call_view`
//! take a signature at runtime and go through `alloy-dyn-abi`.

use crate::errors::{ProviderError, ProviderResult};
use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{keccak256, Address, U256};
use alloy_sol_types::{sol, SolCall};
use serde_json::Value;

sol! {
    /// One avatar or holon row in the storage contract.
    #[derive(Debug, PartialEq, Eq)]
    struct EntityRecord {
        uint256 entityId;
        string id;
        string info;
    }

    function GetAvatarById(uint256 entityId) external view returns (EntityRecord memory record);
    function GetHolonById(uint256 entityId) external view returns (EntityRecord memory record);
    function CreateAvatar(uint256 entityId, string avatarId, string info) external;
    function CreateHolon(uint256 entityId, string holonId, string info) external;
    function UpdateAvatar(uint256 entityId, string info) external;
    function UpdateHolon(uint256 entityId, string info) external;
    function DeleteAvatar(uint256 entityId) external;
    function DeleteHolon(uint256 entityId) external;
    function GetAvatarsCount() external view returns (uint256 count);
    function GetHolonsCount() external view returns (uint256 count);

    function transfer(address to, uint256 amount) external returns (bool success);

    function mint(address to, string tokenUri) external;
    function sendNFT(
        address fromWalletAddress,
        address toWalletAddress,
        uint256 tokenId,
        string fromProviderType,
        string toProviderType,
        uint256 amount,
        string memoText
    ) external;
    function tokenURI(uint256 tokenId) external view returns (string uri);
    function ownerOf(uint256 tokenId) external view returns (address owner);
}

impl EntityRecord {
    /// The contract answers unknown keys with a zeroed row.
    pub fn is_empty(&self) -> bool {
        self.entityId.is_zero() && self.id.is_empty() && self.info.is_empty()
    }
}

fn decode_error(what: &str, err: alloy_sol_types::Error) -> ProviderError {
    ProviderError::decode(format!("Could not decode {} output: {}", what, err))
}

// ═══════════════════════════════════════════════════════════════════
// STORAGE CONTRACT
// ═══════════════════════════════════════════════════════════════════

/// Which table of the storage contract a call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Avatar,
    Holon,
}

impl RecordKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Avatar => "Avatar",
            Self::Holon => "Holon",
        }
    }

    pub fn get(&self, key: U256) -> Vec<u8> {
        match self {
            Self::Avatar => GetAvatarByIdCall { entityId: key }.abi_encode(),
            Self::Holon => GetHolonByIdCall { entityId: key }.abi_encode(),
        }
    }

    pub fn decode_get(&self, data: &[u8]) -> ProviderResult<EntityRecord> {
        match self {
            Self::Avatar => GetAvatarByIdCall::abi_decode_returns(data, true)
                .map(|r| r.record)
                .map_err(|e| decode_error(GetAvatarByIdCall::SIGNATURE, e)),
            Self::Holon => GetHolonByIdCall::abi_decode_returns(data, true)
                .map(|r| r.record)
                .map_err(|e| decode_error(GetHolonByIdCall::SIGNATURE, e)),
        }
    }

    pub fn create(&self, key: U256, id: String, info: String) -> Vec<u8> {
        match self {
            Self::Avatar => CreateAvatarCall {
                entityId: key,
                avatarId: id,
                info,
            }
            .abi_encode(),
            Self::Holon => CreateHolonCall {
                entityId: key,
                holonId: id,
                info,
            }
            .abi_encode(),
        }
    }

    pub fn update(&self, key: U256, info: String) -> Vec<u8> {
        match self {
            Self::Avatar => UpdateAvatarCall { entityId: key, info }.abi_encode(),
            Self::Holon => UpdateHolonCall { entityId: key, info }.abi_encode(),
        }
    }

    pub fn delete(&self, key: U256) -> Vec<u8> {
        match self {
            Self::Avatar => DeleteAvatarCall { entityId: key }.abi_encode(),
            Self::Holon => DeleteHolonCall { entityId: key }.abi_encode(),
        }
    }

    pub fn count(&self) -> Vec<u8> {
        match self {
            Self::Avatar => GetAvatarsCountCall {}.abi_encode(),
            Self::Holon => GetHolonsCountCall {}.abi_encode(),
        }
    }

    pub fn decode_count(&self, data: &[u8]) -> ProviderResult<U256> {
        match self {
            Self::Avatar => GetAvatarsCountCall::abi_decode_returns(data, true)
                .map(|r| r.count)
                .map_err(|e| decode_error(GetAvatarsCountCall::SIGNATURE, e)),
            Self::Holon => GetHolonsCountCall::abi_decode_returns(data, true)
                .map(|r| r.count)
                .map_err(|e| decode_error(GetHolonsCountCall::SIGNATURE, e)),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// TOKENS
// ═══════════════════════════════════════════════════════════════════

/// ERC-20 `transfer(address,uint256)` calldata.
pub fn erc20_transfer(to: &str, amount: u128) -> ProviderResult<Vec<u8>> {
    Ok(transferCall {
        to: parse_address(to)?,
        amount: U256::from(amount),
    }
    .abi_encode())
}

pub fn decode_token_uri(data: &[u8]) -> ProviderResult<String> {
    tokenURICall::abi_decode_returns(data, true)
        .map(|r| r.uri)
        .map_err(|e| decode_error(tokenURICall::SIGNATURE, e))
}

/// Owner address, EIP-55 checksummed.
pub fn decode_owner(data: &[u8]) -> ProviderResult<String> {
    ownerOfCall::abi_decode_returns(data, true)
        .map(|r| r.owner.to_checksum(None))
        .map_err(|e| decode_error(ownerOfCall::SIGNATURE, e))
}

pub fn parse_address(address: &str) -> ProviderResult<Address> {
    address
        .trim()
        .parse::<Address>()
        .map_err(|e| ProviderError::invalid_input(format!("Invalid address {}: {}", address, e)))
}

/// Narrow a contract `uint256` to the `u128` the entity types carry.
pub fn to_u128(value: U256, what: &str) -> ProviderResult<u128> {
    u128::try_from(value)
        .map_err(|_| ProviderError::decode(format!("{} value {} exceeds 128 bits", what, value)))
}

// ═══════════════════════════════════════════════════════════════════
// RUNTIME SIGNATURES
// ═══════════════════════════════════════════════════════════════════

/// A function signature parsed at runtime, e.g. `balanceOf(address)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DynFunction {
    pub name: String,
    pub params: Vec<DynSolType>,
}

impl DynFunction {
    pub fn parse(signature: &str) -> ProviderResult<Self> {
        let malformed =
            || ProviderError::invalid_input(format!("Malformed function signature: {}", signature));
        let signature = signature.trim();
        let (name, rest) = signature.split_once('(').ok_or_else(malformed)?;
        let params = rest.strip_suffix(')').ok_or_else(malformed)?;
        let name = name.trim();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(malformed());
        }

        let params = if params.trim().is_empty() {
            Vec::new()
        } else {
            let params: String = params.chars().filter(|c| !c.is_whitespace()).collect();
            match DynSolType::parse(&format!("({})", params)) {
                Ok(DynSolType::Tuple(types)) => types,
                Ok(single) => vec![single],
                Err(e) => {
                    return Err(ProviderError::invalid_input(format!(
                        "Unsupported parameter types in {}: {}",
                        signature, e
                    )))
                }
            }
        };
        Ok(Self {
            name: name.to_string(),
            params,
        })
    }

    /// `name(type,...)` with canonical type names.
    pub fn canonical(&self) -> String {
        let params: Vec<_> = self.params.iter().map(|p| p.sol_type_name()).collect();
        format!("{}({})", self.name, params.join(","))
    }

    pub fn selector(&self) -> [u8; 4] {
        let digest = keccak256(self.canonical().as_bytes());
        let mut out = [0u8; 4];
        out.copy_from_slice(&digest[..4]);
        out
    }

    /// Calldata for JSON arguments. Integers may be JSON numbers or
    /// decimal / `0x` strings; bytes are `0x` hex strings.
    pub fn encode_json(&self, args: &[Value]) -> ProviderResult<Vec<u8>> {
        if self.params.len() != args.len() {
            return Err(ProviderError::invalid_input(format!(
                "{} takes {} argument(s), got {}",
                self.canonical(),
                self.params.len(),
                args.len()
            )));
        }

        let values = self
            .params
            .iter()
            .zip(args)
            .map(|(ty, arg)| coerce(ty, arg))
            .collect::<ProviderResult<Vec<_>>>()?;

        let mut data = self.selector().to_vec();
        data.extend(DynSolValue::Tuple(values).abi_encode_params());
        Ok(data)
    }
}

fn coerce(ty: &DynSolType, arg: &Value) -> ProviderResult<DynSolValue> {
    let text = match arg {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => {
            return Err(ProviderError::invalid_input(format!(
                "Cannot use {} as {}",
                arg,
                ty.sol_type_name()
            )))
        }
    };
    ty.coerce_str(&text).map_err(|e| {
        ProviderError::invalid_input(format!("Cannot use {} as {}: {}", arg, ty.sol_type_name(), e))
    })
}

// ═══════════════════════════════════════════════════════════════════
// HEX
// ═══════════════════════════════════════════════════════════════════

pub fn to_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

/// Decode `0x`-prefixed hex into bytes.
pub fn decode_hex(data: &str) -> ProviderResult<Vec<u8>> {
    hex::decode(data.trim().trim_start_matches("0x"))
        .map_err(|e| ProviderError::decode(format!("Invalid hex data: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;
    use alloy_sol_types::SolValue;

    #[test]
    fn test_known_selectors() {
        assert_eq!(hex::encode(transferCall::SELECTOR), "a9059cbb");
        assert_eq!(hex::encode(ownerOfCall::SELECTOR), "6352211e");
        let balance_of = DynFunction::parse("balanceOf(address)").unwrap();
        assert_eq!(hex::encode(balance_of.selector()), "70a08231");
    }

    #[test]
    fn test_erc20_transfer_layout() {
        let data = erc20_transfer("0x00000000000000000000000000000000000000ff", 1000).unwrap();
        assert_eq!(&data[..4], &transferCall::SELECTOR);
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(data[4 + 31], 0xff);
        assert_eq!(&data[data.len() - 2..], &[0x03, 0xe8]);

        let err = erc20_transfer("0x12", 1).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }

    #[test]
    fn test_record_round_trip_through_contract_encoding() {
        let record = EntityRecord {
            entityId: U256::from(42u64),
            id: "id-1".into(),
            info: r#"{"username":"alice"}"#.into(),
        };
        let returned = GetAvatarByIdCall::abi_encode_returns(&(record.clone(),));
        // dynamic struct sits behind one offset word
        assert_eq!(returned[31], 0x20);

        assert_eq!(RecordKind::Avatar.decode_get(&returned).unwrap(), record);
        assert!(!record.is_empty());
    }

    #[test]
    fn test_hostile_offsets_are_decode_errors() {
        let mut data = vec![0u8; 24];
        data.extend([0xff; 8]);
        let err = RecordKind::Avatar.decode_get(&data).unwrap_err();
        assert_eq!(err.code, ErrorCode::Decode);

        let mut huge_len = vec![0u8; 31];
        huge_len.push(0x20);
        huge_len.extend([0xff; 32]);
        let err = decode_token_uri(&huge_len).unwrap_err();
        assert_eq!(err.code, ErrorCode::Decode);

        let err = RecordKind::Holon.decode_get(&[0u8; 8]).unwrap_err();
        assert_eq!(err.code, ErrorCode::Decode);
    }

    #[test]
    fn test_full_width_uint_is_kept_until_narrowed() {
        let big = U256::MAX;
        let data = GetAvatarsCountCall::abi_encode_returns(&(big,));
        let count = RecordKind::Avatar.decode_count(&data).unwrap();
        assert_eq!(count, U256::MAX);
        assert_eq!(to_u128(count, "count").unwrap_err().code, ErrorCode::Decode);
        assert_eq!(to_u128(U256::from(7u64), "count").unwrap(), 7);
    }

    #[test]
    fn test_dynamic_signature_parsing() {
        let f = DynFunction::parse("sendNFT(address, uint, bool, bytes)").unwrap();
        assert_eq!(f.canonical(), "sendNFT(address,uint256,bool,bytes)");

        assert!(DynFunction::parse("mint").is_err());
        assert!(DynFunction::parse("(address)").is_err());
        assert!(DynFunction::parse("mint(notatype)").is_err());
        assert_eq!(DynFunction::parse("GetAvatarsCount()").unwrap().params.len(), 0);
    }

    #[test]
    fn test_json_arguments() {
        let f = DynFunction::parse("approve(address,uint256)").unwrap();
        let max = U256::MAX.to_string();
        let data = f
            .encode_json(&[
                serde_json::json!("0x00000000000000000000000000000000000000aa"),
                serde_json::json!(max),
            ])
            .unwrap();
        assert_eq!(&data[..4], &f.selector());
        let decoded = <(Address, U256)>::abi_decode_params(&data[4..], true).unwrap();
        assert_eq!(decoded.1, U256::MAX);

        let err = f.encode_json(&[serde_json::json!("0xaa")]).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);

        let uint = DynFunction::parse("f(uint256)").unwrap();
        assert!(uint.encode_json(&[serde_json::json!(-1)]).is_err());
        assert!(uint.encode_json(&[serde_json::json!(16)]).is_ok());
    }
}
