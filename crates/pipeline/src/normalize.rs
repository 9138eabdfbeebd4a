//! Upstream payload to stored record

use crate::error::{PipelineError, PipelineResult};
use killfeed_core::{Attacker, Killmail, KillmailPayload, NPC_CORPORATION_CEILING, WorkItem};

/// Decode raw upstream bytes for `item` into a stored record
pub fn decode(raw: &[u8], item: &WorkItem) -> PipelineResult<Killmail> {
    let payload: KillmailPayload =
        serde_json::from_slice(raw).map_err(|e| PipelineError::Decode(e.to_string()))?;
    normalize(payload, item)
}

pub fn normalize(payload: KillmailPayload, item: &WorkItem) -> PipelineResult<Killmail> {
    if payload.killmail_id != item.id {
        return Err(PipelineError::IdMismatch {
            expected: item.id,
            got: payload.killmail_id,
        });
    }

    Ok(Killmail {
        id: payload.killmail_id,
        hash: item.hash.clone(),
        killmail_time: payload.killmail_time,
        solar_system_id: payload.solar_system_id,
        moon_id: payload.moon_id,
        war_id: payload.war_id,
        is_npc: is_npc(&payload.attackers),
        is_solo: is_solo(&payload.attackers),
        victim: payload.victim,
        attackers: payload.attackers,
    })
}

/// No attacker with a known corporation is in a player corporation
pub fn is_npc(attackers: &[Attacker]) -> bool {
    !attackers.is_empty()
        && attackers
            .iter()
            .filter_map(|a| a.corporation_id)
            .all(|corp| corp < NPC_CORPORATION_CEILING)
}

pub fn is_solo(attackers: &[Attacker]) -> bool {
    matches!(attackers, [only] if only.in_player_corporation())
}
