use crate::values::Timestamp;
use serde::{Deserialize, Serialize};

/// Corporation ids below this value belong to NPC corporations
pub const NPC_CORPORATION_CEILING: u64 = 98_000_000;

/// Killmail as served by the upstream API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KillmailPayload {
    pub killmail_id: u64,
    pub killmail_time: Timestamp,
    pub solar_system_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moon_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub war_id: Option<u64>,
    pub victim: Victim,
    #[serde(default)]
    pub attackers: Vec<Attacker>,
}

/// Persisted killmail record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Killmail {
    pub id: u64,
    pub hash: String,
    pub killmail_time: Timestamp,
    pub solar_system_id: u64,
    pub moon_id: Option<u64>,
    pub war_id: Option<u64>,
    /// Every attacker is an NPC
    pub is_npc: bool,
    /// A single player attacker
    pub is_solo: bool,
    pub victim: Victim,
    pub attackers: Vec<Attacker>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Victim {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corporation_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alliance_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faction_id: Option<u64>,
    #[serde(default)]
    pub damage_taken: u64,
    pub ship_type_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default)]
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Fitted or cargo item; containers nest their contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub flag: i64,
    pub item_type_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity_destroyed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity_dropped: Option<u64>,
    #[serde(default)]
    pub singleton: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attacker {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corporation_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alliance_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faction_id: Option<u64>,
    #[serde(default)]
    pub damage_done: u64,
    #[serde(default)]
    pub final_blow: bool,
    #[serde(default)]
    pub security_status: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ship_type_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weapon_type_id: Option<u64>,
}

impl Attacker {
    /// True if the attacker belongs to a player corporation
    pub fn in_player_corporation(&self) -> bool {
        self.corporation_id
            .is_some_and(|corp| corp >= NPC_CORPORATION_CEILING)
    }
}
