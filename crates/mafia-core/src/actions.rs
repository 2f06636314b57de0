//! Night actions and day votes: validation on submit, resolution at the
//! phase boundary.

use std::collections::HashMap;

use crate::envelope::Envelope;
use crate::error::{ActionKind, GameError};
use crate::net::messages::{ChatMessageMsg, InvestigationResultMsg, ServerMessage};
use crate::player::{Player, PlayerId};
use crate::role::Role;
use crate::room::{NightChoice, Phase, Room};

/// What the Mafia's night target came to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NightOutcome {
    Killed(PlayerId),
    /// The Doctor protected the Mafia's target.
    Saved(PlayerId),
    /// No target was chosen.
    Quiet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NightReport {
    pub outcome: NightOutcome,
    pub envelopes: Vec<Envelope>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayOutcome {
    Eliminated { id: PlayerId, role: Option<Role> },
    /// Two or more targets shared the highest count.
    Tie,
    NoVotes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayReport {
    pub outcome: DayOutcome,
    pub envelopes: Vec<Envelope>,
}

/// Look up the submitting player and check they may act in `expected` phase.
fn acting_player(
    room: &Room,
    actor: PlayerId,
    expected: Phase,
    action: ActionKind,
) -> Result<Player, GameError> {
    let player = room.player(actor).ok_or(GameError::NotInRoom)?;
    if room.phase != expected {
        return Err(GameError::WrongPhase {
            action,
            phase: room.phase,
        });
    }
    if !player.alive {
        return Err(GameError::Dead(action));
    }
    Ok(player.clone())
}

fn living_target(room: &Room, target: PlayerId) -> Result<&Player, GameError> {
    room.player(target)
        .filter(|p| p.alive)
        .ok_or(GameError::InvalidTarget)
}

/// Record a night action for `actor`.
///
/// The Mafia's target is settled by the first Mafia member to submit in a
/// night; later submissions are answered but not recorded. Doctor and
/// Detective choices are overwritten by resubmission. Roles without a night
/// action are ignored.
pub fn submit_night_action(
    room: &mut Room,
    actor: PlayerId,
    target: PlayerId,
) -> Result<Vec<Envelope>, GameError> {
    let player = acting_player(room, actor, Phase::Night, ActionKind::NightAction)?;
    let role = match player.role {
        Some(role @ (Role::Mafia | Role::Doctor | Role::Detective)) => role,
        _ => return Ok(Vec::new()),
    };

    let target_player = living_target(room, target)?;
    let target_name = target_player.name.clone();
    let target_is_mafia = target_player.is_mafia();

    let choice = NightChoice { actor, target };
    match role {
        Role::Mafia => {
            if target_is_mafia {
                return Err(GameError::FriendlyTarget);
            }
            if let Some(chosen) = room.actions.mafia_target {
                let chosen_name = room.name_of(chosen.target).unwrap_or("someone");
                return Ok(vec![Envelope::notice(
                    actor,
                    format!("Your team already chose {chosen_name} tonight."),
                )]);
            }
            room.actions.mafia_target = Some(choice);
        },
        Role::Doctor => room.actions.doctor_save = Some(choice),
        Role::Detective => {
            if target == actor {
                return Err(GameError::InvalidTarget);
            }
            room.actions.detective_check = Some(choice);
        },
        Role::Villager | Role::Jester => return Ok(Vec::new()),
    }

    tracing::debug!(room = %room.code, player_id = actor, %role, target, "Night action recorded");
    Ok(vec![Envelope::notice(
        actor,
        format!("You chose {target_name} for your night action."),
    )])
}

/// Turn the night's actions into a death (or not) and the Detective's answer.
/// All three night slots are empty afterwards.
pub fn resolve_night(room: &mut Room) -> NightReport {
    let mafia_target = room.actions.mafia_target.take().map(|c| c.target);
    let doctor_save = room.actions.doctor_save.take().map(|c| c.target);
    let detective_check = room.actions.detective_check.take().map(|c| c.target);

    let mut envelopes = Vec::new();
    let outcome = match mafia_target {
        Some(target) if doctor_save == Some(target) => {
            let name = room.name_of(target).unwrap_or("Someone");
            envelopes.push(Envelope::announce(format!(
                "{name} felt a disturbance in the force. No one was killed during the night."
            )));
            NightOutcome::Saved(target)
        },
        Some(target) => match room.player_mut(target) {
            Some(victim) => {
                victim.alive = false;
                envelopes.push(Envelope::announce(format!(
                    "{} was killed during the night.",
                    victim.name
                )));
                NightOutcome::Killed(target)
            },
            None => {
                envelopes.push(Envelope::announce("No one was killed during the night."));
                NightOutcome::Quiet
            },
        },
        None => {
            envelopes.push(Envelope::announce("No one was killed during the night."));
            NightOutcome::Quiet
        },
    };

    if let Some(checked) = detective_check.and_then(|id| room.player(id)) {
        let result = InvestigationResultMsg {
            target_name: checked.name.clone(),
            is_mafia: checked.is_mafia(),
        };
        for detective in room.living().filter(|p| p.has_role(Role::Detective)) {
            envelopes.push(Envelope::player(
                detective.id,
                ServerMessage::InvestigationResult(result.clone()),
            ));
        }
    }

    NightReport { outcome, envelopes }
}

/// Record or change `voter`'s day vote. The vote is announced to the room.
pub fn submit_vote(
    room: &mut Room,
    voter: PlayerId,
    target: PlayerId,
) -> Result<Vec<Envelope>, GameError> {
    let player = acting_player(room, voter, Phase::Day, ActionKind::Vote)?;
    if target == voter {
        return Err(GameError::InvalidTarget);
    }
    let target_name = living_target(room, target)?.name.clone();

    room.actions.votes.insert(voter, target);
    Ok(vec![Envelope::room(ServerMessage::ChatMessage(
        ChatMessageMsg {
            from: player.name,
            text: format!("voted to eliminate {target_name}."),
            mafia_only: false,
        },
    ))])
}

/// Count votes per target. Returns the single target with strictly the most
/// votes, `Tie` if the top count is shared, `NoVotes` if nobody voted.
pub fn tally_votes(votes: &HashMap<PlayerId, PlayerId>) -> DayOutcome {
    let mut counts: HashMap<PlayerId, usize> = HashMap::new();
    for &target in votes.values() {
        *counts.entry(target).or_insert(0) += 1;
    }
    let Some(&top) = counts.values().max() else {
        return DayOutcome::NoVotes;
    };
    let mut leaders = counts.iter().filter(|&(_, &n)| n == top).map(|(&id, _)| id);
    match (leaders.next(), leaders.next()) {
        (Some(id), None) => DayOutcome::Eliminated { id, role: None },
        _ => DayOutcome::Tie,
    }
}

/// Resolve the day's votes. Votes are always cleared.
pub fn resolve_day(room: &mut Room) -> DayReport {
    let votes = std::mem::take(&mut room.actions.votes);
    let mut envelopes = Vec::new();

    let outcome = match tally_votes(&votes) {
        DayOutcome::Eliminated { id, .. } => match room.player_mut(id) {
            Some(voted_out) => {
                voted_out.alive = false;
                envelopes.push(Envelope::announce(format!(
                    "{} was voted out.",
                    voted_out.name
                )));
                DayOutcome::Eliminated {
                    id,
                    role: voted_out.role,
                }
            },
            None => {
                envelopes.push(Envelope::announce("No one was eliminated."));
                DayOutcome::NoVotes
            },
        },
        DayOutcome::Tie => {
            envelopes.push(Envelope::announce("No one was eliminated due to a tie."));
            DayOutcome::Tie
        },
        DayOutcome::NoVotes => {
            envelopes.push(Envelope::announce("No one voted. No one was eliminated."));
            DayOutcome::NoVotes
        },
    };

    DayReport { outcome, envelopes }
}
