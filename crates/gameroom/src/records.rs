use rvb_cards::Card;
use rvb_cards::Hole;
use rvb_core::*;
use rvb_gameplay::PotResult;

/// One participant's line in a completed hand.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Participant {
    pub position: Position,
    pub player: PlayerId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hole: Option<Hole>,
    pub spent: Chips,
    pub reward: Chips,
}

/// A completed hand for the history sink.
///
/// Appends are idempotent by `id`; the sink never reads back into the
/// actor. Analytics over these records are out of scope here.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HandRecord {
    pub id: HandId,
    pub table: TableId,
    pub hand_number: HandNumber,
    pub button: Position,
    pub board: Vec<Card>,
    pub participants: Vec<Participant>,
    pub pots: Vec<PotResult>,
}

impl HandRecord {
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("hand record serializes")
    }
}
