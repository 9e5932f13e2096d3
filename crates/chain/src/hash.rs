//! keccak-based identifiers used as opaque on-chain keys. Pure
//! functions, computed off-chain and verified or stored on-chain.

use ethers::{
    types::{Address, H256},
    utils::keccak256,
};

use crate::client::RecipientHash;

/// keccak256 of the name, the full 32-byte key for uploaded data.
pub fn data_hash(name: &str) -> H256 {
    H256(keccak256(name.as_bytes()))
}

/// Last 20 bytes of keccak256 of the name, the `bytes20` recipient key.
pub fn recipient_hash(name: &str) -> RecipientHash {
    let digest = keccak256(name.as_bytes());
    RecipientHash::from_slice(&digest[12..])
}

/// Content hash of a message: keccak256 over the solidity-packed
/// encoding of (address sender, uint48 createDate, uint48 createBlock,
/// bytes20[] recipientList, string content). Packed array elements are
/// padded to full 32-byte words, matching `abi.encodePacked`.
pub fn message_hash(
    sender: Address,
    create_date: u64,
    create_block: u64,
    recipients: &[RecipientHash],
    content: &str,
) -> H256 {
    let mut packed = Vec::with_capacity(20 + 6 + 6 + recipients.len() * 32 + content.len());
    packed.extend_from_slice(sender.as_bytes());
    packed.extend_from_slice(&uint48_be(create_date));
    packed.extend_from_slice(&uint48_be(create_block));
    for recipient in recipients {
        // bytes20 left-aligned in a 32-byte word
        packed.extend_from_slice(recipient.as_bytes());
        packed.extend_from_slice(&[0u8; 12]);
    }
    packed.extend_from_slice(content.as_bytes());
    H256(keccak256(&packed))
}

fn uint48_be(value: u64) -> [u8; 6] {
    let bytes = value.to_be_bytes();
    [bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipient_hash_is_tail_of_data_hash() {
        let name = "alice";
        let full = data_hash(name);
        let short = recipient_hash(name);
        assert_eq!(short.as_bytes(), &full.as_bytes()[12..]);
    }

    #[test]
    fn hashes_are_deterministic_and_distinct() {
        assert_eq!(data_hash("room:general"), data_hash("room:general"));
        assert_ne!(data_hash("room:general"), data_hash("room:random"));
        assert_ne!(recipient_hash("alice"), recipient_hash("bob"));
    }

    #[test]
    fn message_hash_covers_every_field() {
        let sender = Address::repeat_byte(0x01);
        let alice = recipient_hash("alice");
        let bob = recipient_hash("bob");

        let base = message_hash(sender, 100, 200, &[alice], "hi");
        assert_ne!(base, message_hash(sender, 101, 200, &[alice], "hi"));
        assert_ne!(base, message_hash(sender, 100, 201, &[alice], "hi"));
        assert_ne!(base, message_hash(sender, 100, 200, &[bob], "hi"));
        assert_ne!(base, message_hash(sender, 100, 200, &[alice], "hi!"));
        // recipient order matters
        assert_ne!(
            message_hash(sender, 100, 200, &[alice, bob], "hi"),
            message_hash(sender, 100, 200, &[bob, alice], "hi"),
        );
    }
}
