use super::card::Card;
use rand::Rng;
use rand::RngCore;
use rand::SeedableRng;
use rand::rngs::StdRng;
use sha2::Digest;
use sha2::Sha256;

/// Seed driving the deterministic shuffle permutation.
pub type Seed = [u8; 32];
/// Nonce binding the pre-shuffle commitment.
pub type Nonce = [u8; 16];
/// SHA-256 output for commitments and shuffle proofs.
pub type Digest32 = [u8; 32];

pub const DECK_SIZE: usize = 52;

/// The 52 cards in canonical order: ranks ascending, suits within rank.
///
/// This fixed order is the baseline every shuffle commitment references.
pub fn canonical() -> Vec<Card> {
    (0..DECK_SIZE as u8).map(Card::from).collect()
}

/// Deck integrity failures. Both are fatal for the hand in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckError {
    InvalidCommitment,
    InvalidShuffleProof,
}

impl std::fmt::Display for DeckError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::InvalidCommitment => write!(f, "deck commitment does not recompute"),
            Self::InvalidShuffleProof => write!(f, "shuffle proof does not recompute"),
        }
    }
}

impl std::error::Error for DeckError {}

/// A fresh deck in canonical order, committed to before shuffling.
///
/// `commitment = H(canonical_cards ∥ nonce)` is published before the seed
/// is drawn, so the dealer cannot retroactively choose an ordering.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CommittedDeck {
    cards: Vec<Card>,
    nonce: Nonce,
    commitment: Digest32,
}

impl CommittedDeck {
    /// Generates the canonical deck with a random nonce and its commitment.
    pub fn generate() -> Self {
        let mut nonce = Nonce::default();
        rand::rng().fill_bytes(&mut nonce);
        let cards = canonical();
        let commitment = commit(&cards, &nonce);
        Self {
            cards,
            nonce,
            commitment,
        }
    }
    pub fn commitment(&self) -> Digest32 {
        self.commitment
    }
    /// Shuffles with a fresh seed from the OS-backed RNG. Seeds are never reused.
    pub fn shuffle(self) -> ShuffledDeck {
        let mut seed = Seed::default();
        rand::rng().fill_bytes(&mut seed);
        self.shuffle_with(seed)
    }
    /// Shuffles with an explicit seed. The permutation is a seed-driven
    /// Fisher–Yates, so any party holding the seed can reproduce it.
    pub fn shuffle_with(self, seed: Seed) -> ShuffledDeck {
        let shuffled = fisher_yates(&self.cards, seed);
        let proof = prove(&self.cards, &shuffled, &seed);
        ShuffledDeck {
            committed: self,
            shuffled,
            seed,
            proof,
            cursor: 0,
            burned: Vec::new(),
        }
    }
}

/// A shuffled deck with its audit trail and a draw cursor.
///
/// `proof = H(canonical_cards ∥ shuffled_cards ∥ seed)` binds the ordering
/// to the committed deck; [`verify`](Self::verify) re-runs the permutation
/// and recomputes both hashes. Serializable so an in-flight hand survives
/// a checkpoint and restart.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ShuffledDeck {
    committed: CommittedDeck,
    shuffled: Vec<Card>,
    seed: Seed,
    proof: Digest32,
    cursor: usize,
    burned: Vec<Card>,
}

impl ShuffledDeck {
    pub fn commitment(&self) -> Digest32 {
        self.committed.commitment
    }
    pub fn proof(&self) -> Digest32 {
        self.proof
    }
    pub fn seed(&self) -> Seed {
        self.seed
    }
    /// Cards drawn so far, burns included.
    pub fn drawn(&self) -> usize {
        self.cursor
    }
    pub fn burned(&self) -> &[Card] {
        &self.burned
    }
    /// Draws the next card. `None` once the deck is exhausted.
    pub fn draw(&mut self) -> Option<Card> {
        let card = self.shuffled.get(self.cursor).copied();
        if card.is_some() {
            self.cursor += 1;
        }
        card
    }
    /// Burns the next card. Burned cards never re-enter play.
    pub fn burn(&mut self) -> Option<Card> {
        let card = self.draw();
        if let Some(card) = card {
            self.burned.push(card);
        }
        card
    }
    /// Re-runs the shuffle from the recorded seed and recomputes both
    /// hashes. Any mismatch is fatal for the hand being dealt.
    pub fn verify(&self) -> Result<(), DeckError> {
        if commit(&self.committed.cards, &self.committed.nonce) != self.committed.commitment {
            return Err(DeckError::InvalidCommitment);
        }
        let replay = fisher_yates(&self.committed.cards, self.seed);
        if replay != self.shuffled {
            return Err(DeckError::InvalidShuffleProof);
        }
        if prove(&self.committed.cards, &self.shuffled, &self.seed) != self.proof {
            return Err(DeckError::InvalidShuffleProof);
        }
        Ok(())
    }
}

fn commit(cards: &[Card], nonce: &Nonce) -> Digest32 {
    let mut hasher = Sha256::new();
    hasher.update(bytes(cards));
    hasher.update(nonce);
    hasher.finalize().into()
}

fn prove(canonical: &[Card], shuffled: &[Card], seed: &Seed) -> Digest32 {
    let mut hasher = Sha256::new();
    hasher.update(bytes(canonical));
    hasher.update(bytes(shuffled));
    hasher.update(seed);
    hasher.finalize().into()
}

fn bytes(cards: &[Card]) -> Vec<u8> {
    cards.iter().map(|c| u8::from(*c)).collect()
}

/// Deterministic Fisher–Yates permutation driven by the seed.
fn fisher_yates(cards: &[Card], seed: Seed) -> Vec<Card> {
    let mut rng = StdRng::from_seed(seed);
    let mut cards = cards.to_vec();
    for i in (1..cards.len()).rev() {
        let j = rng.random_range(0..=i);
        cards.swap(i, j);
    }
    cards
}
