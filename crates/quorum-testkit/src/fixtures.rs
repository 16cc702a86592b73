//! Ready-made policies and rituals

use crate::chain::MockChain;
use crate::relay::MockRelay;
use crate::schemes::{ToyDkg, ToyPre};
use quorum_core::crypto::SessionStaticSecret;
use quorum_core::effects::RitualParticipant;
use quorum_core::protocol::{EncryptedKeyFrag, EncryptedTreasureMap, PublicKey, SecretKey, TreasureMap};
use quorum_core::{Address, Result, RitualId};

/// Deterministic participant address
pub fn participant(index: u8) -> Address {
    let mut bytes = [0u8; Address::LENGTH];
    bytes[0] = 0xa0;
    bytes[Address::LENGTH - 1] = index;
    Address::new(bytes)
}

/// Re-encryption policy granted to one recipient
pub struct PrePolicyFixture {
    /// Fragments needed to decrypt
    pub threshold: u8,
    /// Participants holding a key fragment
    pub participants: Vec<Address>,
    /// Policy's public encrypting key
    pub policy_encrypting_key: PublicKey,
    /// Publisher's verifying key
    pub publisher_verifying_key: PublicKey,
    /// Recipient's decrypting key
    pub recipient_secret_key: SecretKey,
    /// Recipient's encrypting key
    pub recipient_encrypting_key: PublicKey,
    /// Recipient's verifying key
    pub recipient_verifying_key: PublicKey,
    /// Participant map encrypted for the recipient
    pub encrypted_treasure_map: EncryptedTreasureMap,
}

impl PrePolicyFixture {
    /// `threshold`-of-`shares` policy
    pub fn new(threshold: u8, shares: u8) -> Result<Self> {
        let policy_encrypting_key = ToyPre::policy_key(threshold);
        let publisher_verifying_key = ToyPre::publisher_key();
        let (recipient_secret_key, recipient_encrypting_key) = ToyPre::recipient_keypair();
        let participants: Vec<Address> = (1..=shares).map(participant).collect();

        let map = TreasureMap {
            threshold,
            destinations: participants
                .iter()
                .map(|p| (*p, EncryptedKeyFrag::from_bytes(p.as_bytes().to_vec())))
                .collect(),
            policy_encrypting_key: policy_encrypting_key.clone(),
            publisher_verifying_key: publisher_verifying_key.clone(),
        };
        let encrypted_treasure_map =
            ToyPre::encrypt_treasure_map(&map, &recipient_encrypting_key, &publisher_verifying_key)?;

        Ok(Self {
            threshold,
            participants,
            policy_encrypting_key,
            publisher_verifying_key,
            recipient_secret_key,
            recipient_encrypting_key,
            recipient_verifying_key: ToyPre::publisher_key(),
            encrypted_treasure_map,
        })
    }
}

/// DKG ritual whose participants are simulated by a [`MockRelay`]
pub struct DkgRitualFixture {
    /// Ritual id
    pub ritual_id: RitualId,
    /// Shares needed to decrypt
    pub threshold: usize,
    /// Aggregated public key
    pub public_key: PublicKey,
    /// Published participant records
    pub participants: Vec<RitualParticipant>,
    secrets: Vec<(Address, SessionStaticSecret)>,
}

impl DkgRitualFixture {
    /// `threshold`-of-`shares` ritual
    pub fn new(ritual_id: RitualId, threshold: u8, shares: u8) -> Self {
        let secrets: Vec<(Address, SessionStaticSecret)> = (1..=shares)
            .map(|i| (participant(i), SessionStaticSecret::random()))
            .collect();
        let participants = secrets
            .iter()
            .map(|(provider, secret)| RitualParticipant {
                provider: *provider,
                public_key: secret.public_key(),
            })
            .collect();
        Self {
            ritual_id,
            threshold: usize::from(threshold),
            public_key: ToyDkg::ritual_public_key(threshold),
            participants,
            secrets,
        }
    }

    /// Participant addresses in ritual order
    pub fn providers(&self) -> Vec<Address> {
        self.participants.iter().map(|p| p.provider).collect()
    }

    /// Register this ritual on a chain
    pub fn register(&self, chain: MockChain) -> MockChain {
        chain.with_ritual(self.ritual_id, self.participants.clone(), self.public_key.clone())
    }

    /// Relay able to answer for every participant
    pub fn relay(&self) -> MockRelay {
        self.secrets
            .iter()
            .fold(MockRelay::new(), |relay, (provider, secret)| {
                relay.with_session_secret(*provider, secret.clone())
            })
    }
}
