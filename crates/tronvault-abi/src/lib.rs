//! Solidity-ABI encoding for the vault's `allBatch` entry point.
//!
//! Call shapes:
//! - Protected: `allBatch(sigData, deployFetchParams[], fetchParams[], transferParams[])`
//! - Legacy:    `allBatch(deployFetchParams[], fetchParams[], transferParams[])`
//!
//! All element tuples are static, so each dynamic array encodes as a head
//! offset plus `len ++ elements` in the tail. Empty arrays still get their
//! offset and a zero length word.

use sha3::{Digest, Keccak256};
use tronvault_types::{Address, ReplayGuard, Result, SwapId, VaultError};

const WORD: usize = 32;

/// `allBatch` signature without replay protection (legacy shape).
pub const ALL_BATCH_SIG: &str =
    "allBatch((bytes32,address)[],(address,address)[],(address,address,uint256)[])";

/// `allBatch` signature with the replay guard tuple as the first argument.
pub const ALL_BATCH_PROTECTED_SIG: &str =
    "allBatch((uint256,uint256,address),(bytes32,address)[],(address,address)[],(address,address,uint256)[])";

/// Wire tuple for a deploy-and-fetch entry: `(bytes32 swapID, address token)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployFetchParams {
    pub swap_id: SwapId,
    pub token: Address,
}

/// Wire tuple for a fetch entry: `(address depositAddress, address token)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchParams {
    pub deposit_address: Address,
    pub token: Address,
}

/// Wire tuple for a transfer entry: `(address token, address recipient, uint256 amount)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferParams {
    pub token: Address,
    pub recipient: Address,
    pub amount: u128,
}

/// First 4 bytes of Keccak-256 over the canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[..4]);
    out
}

fn address_word(addr: &Address) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[12..].copy_from_slice(addr.as_bytes());
    word
}

fn u64_word(v: u64) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[24..].copy_from_slice(&v.to_be_bytes());
    word
}

fn u128_word(v: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[16..].copy_from_slice(&v.to_be_bytes());
    word
}

fn encode_deploy_array(entries: &[DeployFetchParams]) -> Vec<u8> {
    let mut out = Vec::with_capacity(WORD * (1 + 2 * entries.len()));
    out.extend_from_slice(&u64_word(entries.len() as u64));
    for e in entries {
        out.extend_from_slice(e.swap_id.as_bytes());
        out.extend_from_slice(&address_word(&e.token));
    }
    out
}

fn encode_fetch_array(entries: &[FetchParams]) -> Vec<u8> {
    let mut out = Vec::with_capacity(WORD * (1 + 2 * entries.len()));
    out.extend_from_slice(&u64_word(entries.len() as u64));
    for e in entries {
        out.extend_from_slice(&address_word(&e.deposit_address));
        out.extend_from_slice(&address_word(&e.token));
    }
    out
}

fn encode_transfer_array(entries: &[TransferParams]) -> Vec<u8> {
    let mut out = Vec::with_capacity(WORD * (1 + 3 * entries.len()));
    out.extend_from_slice(&u64_word(entries.len() as u64));
    for e in entries {
        out.extend_from_slice(&address_word(&e.token));
        out.extend_from_slice(&address_word(&e.recipient));
        out.extend_from_slice(&u128_word(e.amount));
    }
    out
}

/// Encode a full `allBatch` call. The shape (protected vs. legacy) follows
/// from whether a replay guard is present.
pub fn encode_all_batch(
    guard: Option<&ReplayGuard>,
    deploy_and_fetch: &[DeployFetchParams],
    fetch: &[FetchParams],
    transfer: &[TransferParams],
) -> Vec<u8> {
    let signature = if guard.is_some() {
        ALL_BATCH_PROTECTED_SIG
    } else {
        ALL_BATCH_SIG
    };

    let tails = [
        encode_deploy_array(deploy_and_fetch),
        encode_fetch_array(fetch),
        encode_transfer_array(transfer),
    ];

    // Head: optional inline guard tuple, then one offset word per array.
    let head_words = if guard.is_some() { 3 + 3 } else { 3 };
    let mut head: Vec<u8> = Vec::with_capacity(WORD * head_words);
    if let Some(g) = guard {
        head.extend_from_slice(&u64_word(g.sig_version));
        head.extend_from_slice(&u64_word(g.nonce));
        head.extend_from_slice(&address_word(&g.sender_address()));
    }

    let mut offset = WORD * head_words;
    for tail in &tails {
        head.extend_from_slice(&u64_word(offset as u64));
        offset += tail.len();
    }

    let mut out = selector(signature).to_vec();
    out.extend_from_slice(&head);
    for tail in &tails {
        out.extend_from_slice(tail);
    }
    out
}

/// A decoded `allBatch` call, used for round-trip checks against the wire
/// contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBatchCall {
    pub guard: Option<ReplayGuard>,
    pub deploy_and_fetch: Vec<DeployFetchParams>,
    pub fetch: Vec<FetchParams>,
    pub transfer: Vec<TransferParams>,
}

fn word_at(args: &[u8], index: usize) -> Result<&[u8]> {
    let start = index * WORD;
    args.get(start..start + WORD)
        .ok_or_else(|| VaultError::Calldata(format!("missing word {}", index)))
}

fn word_to_u64(word: &[u8]) -> Result<u64> {
    if word[..24].iter().any(|b| *b != 0) {
        return Err(VaultError::Calldata("quantity exceeds u64".into()));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[24..]);
    Ok(u64::from_be_bytes(buf))
}

fn word_to_u128(word: &[u8]) -> Result<u128> {
    if word[..16].iter().any(|b| *b != 0) {
        return Err(VaultError::Calldata("amount exceeds u128".into()));
    }
    let mut buf = [0u8; 16];
    buf.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(buf))
}

fn word_to_address(word: &[u8]) -> Result<Address> {
    if word[..12].iter().any(|b| *b != 0) {
        return Err(VaultError::Calldata("address word has nonzero padding".into()));
    }
    let mut buf = [0u8; 20];
    buf.copy_from_slice(&word[12..]);
    Ok(Address::new(buf))
}

fn word_to_swap_id(word: &[u8]) -> SwapId {
    let mut buf = [0u8; 32];
    buf.copy_from_slice(word);
    SwapId::new(buf)
}

/// Read the length of the array whose head offset lives at `head_index`,
/// returning (word index of first element, element count).
fn array_bounds(args: &[u8], head_index: usize) -> Result<(usize, usize)> {
    let offset = word_to_u64(word_at(args, head_index)?)? as usize;
    if offset % WORD != 0 {
        return Err(VaultError::Calldata("unaligned array offset".into()));
    }
    let len_index = offset / WORD;
    let len = word_to_u64(word_at(args, len_index)?)? as usize;
    Ok((len_index + 1, len))
}

/// Decode a full `allBatch` call (either shape, selected by selector).
pub fn decode_all_batch(calldata: &[u8]) -> Result<DecodedBatchCall> {
    if calldata.len() < 4 {
        return Err(VaultError::Calldata("calldata shorter than selector".into()));
    }
    let (sel, args) = calldata.split_at(4);

    let protected = if sel == selector(ALL_BATCH_PROTECTED_SIG) {
        true
    } else if sel == selector(ALL_BATCH_SIG) {
        false
    } else {
        return Err(VaultError::Calldata(format!(
            "unknown selector 0x{}",
            hex::encode(sel)
        )));
    };

    let guard = if protected {
        Some(ReplayGuard {
            sig_version: word_to_u64(word_at(args, 0)?)?,
            nonce: word_to_u64(word_at(args, 1)?)?,
            sender: *word_to_address(word_at(args, 2)?)?.as_bytes(),
        })
    } else {
        None
    };

    let base = if protected { 3 } else { 0 };

    let (start, len) = array_bounds(args, base)?;
    let mut deploy_and_fetch = Vec::with_capacity(len);
    for i in 0..len {
        deploy_and_fetch.push(DeployFetchParams {
            swap_id: word_to_swap_id(word_at(args, start + 2 * i)?),
            token: word_to_address(word_at(args, start + 2 * i + 1)?)?,
        });
    }

    let (start, len) = array_bounds(args, base + 1)?;
    let mut fetch = Vec::with_capacity(len);
    for i in 0..len {
        fetch.push(FetchParams {
            deposit_address: word_to_address(word_at(args, start + 2 * i)?)?,
            token: word_to_address(word_at(args, start + 2 * i + 1)?)?,
        });
    }

    let (start, len) = array_bounds(args, base + 2)?;
    let mut transfer = Vec::with_capacity(len);
    for i in 0..len {
        transfer.push(TransferParams {
            token: word_to_address(word_at(args, start + 3 * i)?)?,
            recipient: word_to_address(word_at(args, start + 3 * i + 1)?)?,
            amount: word_to_u128(word_at(args, start + 3 * i + 2)?)?,
        });
    }

    Ok(DecodedBatchCall {
        guard,
        deploy_and_fetch,
        fetch,
        transfer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::new([byte; 20])
    }

    #[test]
    fn test_selectors_are_distinct() {
        assert_ne!(selector(ALL_BATCH_SIG), selector(ALL_BATCH_PROTECTED_SIG));
    }

    #[test]
    fn test_empty_legacy_batch_encodes_all_arrays() {
        let data = encode_all_batch(None, &[], &[], &[]);

        // Selector + 3 offset words + 3 zero-length words.
        assert_eq!(data.len(), 4 + 3 * WORD + 3 * WORD);

        let args = &data[4..];
        for (i, expected_offset) in [(0usize, 96u64), (1, 128), (2, 160)] {
            assert_eq!(
                word_to_u64(word_at(args, i).unwrap()).unwrap(),
                expected_offset
            );
        }

        let decoded = decode_all_batch(&data).unwrap();
        assert!(decoded.guard.is_none());
        assert!(decoded.deploy_and_fetch.is_empty());
        assert!(decoded.fetch.is_empty());
        assert!(decoded.transfer.is_empty());
    }

    #[test]
    fn test_empty_protected_batch_encodes_guard_and_arrays() {
        let guard = ReplayGuard {
            sig_version: 1,
            nonce: 0xDEAD_BEEF,
            sender: *addr(0x11).as_bytes(),
        };
        let data = encode_all_batch(Some(&guard), &[], &[], &[]);

        // Selector + guard tuple (3 words) + 3 offsets + 3 zero lengths.
        assert_eq!(data.len(), 4 + 6 * WORD + 3 * WORD);

        let decoded = decode_all_batch(&data).unwrap();
        assert_eq!(decoded.guard, Some(guard));
        assert!(decoded.transfer.is_empty());
    }

    #[test]
    fn test_transfer_round_trip_preserves_field_order() {
        let recipient = Address::from_hex("0x4838b106fce9647bdf1e7877bf73ce8b0bad5f97").unwrap();
        let entry = TransferParams {
            token: Address::NATIVE,
            recipient,
            amount: 1_000_000,
        };
        let data = encode_all_batch(None, &[], &[], &[entry]);

        // Raw layout of the transfer element: token word, recipient word,
        // amount word, in that order.
        let args = &data[4..];
        let elem_start = 160 + WORD; // transfer tail offset + length word
        assert_eq!(&args[elem_start + 12..elem_start + 32], &[0xEE; 20]);
        assert_eq!(
            &args[elem_start + WORD + 12..elem_start + 2 * WORD],
            recipient.as_bytes()
        );

        let decoded = decode_all_batch(&data).unwrap();
        assert_eq!(decoded.transfer, vec![entry]);
        assert!(decoded.transfer[0].token.is_native());
    }

    #[test]
    fn test_mixed_batch_round_trip() {
        let guard = ReplayGuard {
            sig_version: 1,
            nonce: 42,
            sender: *addr(0xAA).as_bytes(),
        };
        let deploy = vec![DeployFetchParams {
            swap_id: SwapId::new([7u8; 32]),
            token: addr(0x22),
        }];
        let fetch = vec![
            FetchParams {
                deposit_address: addr(0x33),
                token: Address::NATIVE,
            },
            FetchParams {
                deposit_address: addr(0x44),
                token: addr(0x55),
            },
        ];
        let transfer = vec![TransferParams {
            token: addr(0x66),
            recipient: addr(0x77),
            amount: u128::MAX,
        }];

        let data = encode_all_batch(Some(&guard), &deploy, &fetch, &transfer);
        let decoded = decode_all_batch(&data).unwrap();

        assert_eq!(decoded.guard, Some(guard));
        assert_eq!(decoded.deploy_and_fetch, deploy);
        assert_eq!(decoded.fetch, fetch);
        assert_eq!(decoded.transfer, transfer);
    }

    #[test]
    fn test_decode_rejects_bad_calldata() {
        assert!(decode_all_batch(&[0x01, 0x02]).is_err());

        let mut data = encode_all_batch(None, &[], &[], &[]);
        data[0] ^= 0xFF; // corrupt the selector
        assert!(decode_all_batch(&data).is_err());

        let data = encode_all_batch(None, &[], &[], &[]);
        assert!(decode_all_batch(&data[..data.len() - WORD]).is_err());
    }
}
