//! The room's phase state machine.
//!
//! `Waiting -> Night -> Day -> Night -> ... -> Ended`. `start_game` leaves
//! Waiting, and `advance` is called by the room's timer at the end of each
//! timed phase. Every transition returns the messages it produced together
//! with the phase whose timer should be armed next, if any.

use rand::Rng;

use crate::actions::{self, DayOutcome};
use crate::envelope::Envelope;
use crate::error::GameError;
use crate::net::messages::{GameOverMsg, PhaseChangedMsg, RoleAssignedMsg, ServerMessage};
use crate::player::PlayerId;
use crate::role::{self, Role};
use crate::room::{PendingActions, Phase, Room};
use crate::win::{self, Winner};

/// Fewest players a game can start with.
pub const MIN_PLAYERS: usize = 4;

/// Result of a phase transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub envelopes: Vec<Envelope>,
    /// The timed phase the room is now in, or `None` if no timer should run.
    pub next: Option<Phase>,
}

impl Transition {
    fn idle() -> Self {
        Self {
            envelopes: Vec::new(),
            next: None,
        }
    }
}

/// Start the game in `room` on behalf of `requester`.
///
/// Deals roles, tells each player their own role privately (and each Mafia
/// member who their partners are), then enters Night.
pub fn start_game<R: Rng + ?Sized>(
    room: &mut Room,
    requester: PlayerId,
    rng: &mut R,
) -> Result<Transition, GameError> {
    if !room.contains(requester) {
        return Err(GameError::NotInRoom);
    }
    if room.phase != Phase::Waiting {
        return Err(GameError::GameAlreadyStarted);
    }
    if room.host != requester {
        return Err(GameError::NotHost);
    }
    if room.players.len() < MIN_PLAYERS {
        return Err(GameError::InsufficientPlayers {
            needed: MIN_PLAYERS,
            have: room.players.len(),
        });
    }

    let counts = role::assign_roles(&mut room.players, rng)?;
    room.actions = PendingActions::default();
    room.winner = None;
    tracing::info!(
        room = %room.code,
        players = room.players.len(),
        mafia = counts.mafia,
        "Game started"
    );

    let mut envelopes = Vec::with_capacity(room.players.len() * 3 + 3);
    for player in &room.players {
        let Some(role) = player.role else { continue };
        envelopes.push(Envelope::player(
            player.id,
            ServerMessage::RoleAssigned(RoleAssignedMsg { role }),
        ));
        envelopes.push(Envelope::notice(player.id, format!("You are {role}.")));

        if role == Role::Mafia {
            let partners: Vec<&str> = room
                .players
                .iter()
                .filter(|p| p.is_mafia() && p.id != player.id)
                .map(|p| p.name.as_str())
                .collect();
            if !partners.is_empty() {
                envelopes.push(Envelope::notice(
                    player.id,
                    format!("Other Mafia(s): {}", partners.join(", ")),
                ));
            }
        }
    }

    enter(room, Phase::Night, &mut envelopes);
    Ok(Transition {
        envelopes,
        next: Some(Phase::Night),
    })
}

/// End the current timed phase: resolve what was gathered during it, check
/// for a winner, and move to the next phase. Does nothing outside Night and
/// Day.
pub fn advance(room: &mut Room) -> Transition {
    match room.phase {
        Phase::Night => {
            let report = actions::resolve_night(room);
            tracing::debug!(room = %room.code, outcome = ?report.outcome, "Night resolved");
            let mut envelopes = report.envelopes;
            match win::evaluate(room) {
                Some(winner) => finish(room, winner, envelopes),
                None => {
                    enter(room, Phase::Day, &mut envelopes);
                    Transition {
                        envelopes,
                        next: Some(Phase::Day),
                    }
                },
            }
        },
        Phase::Day => {
            let report = actions::resolve_day(room);
            tracing::debug!(room = %room.code, outcome = ?report.outcome, "Day resolved");
            let mut envelopes = report.envelopes;
            let winner = match report.outcome {
                DayOutcome::Eliminated {
                    role: Some(Role::Jester),
                    ..
                } => Some(Winner::Jester),
                _ => win::evaluate(room),
            };
            match winner {
                Some(winner) => finish(room, winner, envelopes),
                None => {
                    room.actions.votes.clear();
                    enter(room, Phase::Night, &mut envelopes);
                    Transition {
                        envelopes,
                        next: Some(Phase::Night),
                    }
                },
            }
        },
        Phase::Waiting | Phase::Ended => Transition::idle(),
    }
}

fn enter(room: &mut Room, phase: Phase, envelopes: &mut Vec<Envelope>) {
    room.phase = phase;
    tracing::info!(room = %room.code, %phase, "Phase changed");
    envelopes.push(Envelope::room(ServerMessage::RoomUpdate(room.view())));
    envelopes.push(Envelope::room(ServerMessage::PhaseChanged(
        PhaseChangedMsg { phase },
    )));
    match phase {
        Phase::Night => {
            envelopes.push(Envelope::announce("Night has fallen. Mafia, make your move!"))
        },
        Phase::Day => envelopes.push(Envelope::announce(
            "Day has begun! Discuss and vote to eliminate.",
        )),
        Phase::Waiting | Phase::Ended => {},
    }
}

fn finish(room: &mut Room, winner: Winner, mut envelopes: Vec<Envelope>) -> Transition {
    room.winner = Some(winner);
    room.phase = Phase::Ended;
    room.actions = PendingActions::default();
    tracing::info!(room = %room.code, %winner, "Game over");

    envelopes.push(Envelope::announce(winner.announcement()));
    envelopes.push(Envelope::room(ServerMessage::GameOver(GameOverMsg {
        winner,
    })));
    envelopes.push(Envelope::room(ServerMessage::RoomUpdate(room.view())));
    envelopes.push(Envelope::room(ServerMessage::PhaseChanged(
        PhaseChangedMsg {
            phase: Phase::Ended,
        },
    )));
    Transition {
        envelopes,
        next: None,
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::actions::{submit_night_action, submit_vote};
    use crate::envelope::Recipient;
    use crate::test_helpers::{lobby, room_with_roles, system_lines};

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0xC0FFEE)
    }

    fn private_to(envelopes: &[Envelope], id: PlayerId) -> Vec<&ServerMessage> {
        envelopes
            .iter()
            .filter(|e| e.to == Recipient::Player(id))
            .map(|e| &e.msg)
            .collect()
    }

    fn role_notices(envelopes: &[Envelope]) -> usize {
        envelopes
            .iter()
            .filter(|e| matches!(e.msg, ServerMessage::RoleAssigned(_)))
            .count()
    }

    #[test]
    fn only_host_can_start() {
        let mut room = lobby(4);
        assert_eq!(start_game(&mut room, 2, &mut rng()), Err(GameError::NotHost));
        assert_eq!(room.phase, Phase::Waiting);
        assert!(room.players.iter().all(|p| p.role.is_none()));
    }

    #[test]
    fn start_needs_four_players() {
        let mut room = lobby(3);
        assert_eq!(
            start_game(&mut room, 1, &mut rng()),
            Err(GameError::InsufficientPlayers { needed: 4, have: 3 })
        );
        assert_eq!(room.phase, Phase::Waiting);
    }

    #[test]
    fn outsider_cannot_start() {
        let mut room = lobby(4);
        assert_eq!(start_game(&mut room, 9, &mut rng()), Err(GameError::NotInRoom));
    }

    #[test]
    fn start_assigns_roles_once_and_enters_night() {
        let mut room = lobby(4);
        let t = start_game(&mut room, 1, &mut rng()).unwrap();

        assert_eq!(room.phase, Phase::Night);
        assert_eq!(t.next, Some(Phase::Night));
        assert_eq!(role_notices(&t.envelopes), 4);
        for player in &room.players {
            let assigned: Vec<_> = private_to(&t.envelopes, player.id)
                .into_iter()
                .filter_map(|m| match m {
                    ServerMessage::RoleAssigned(r) => Some(r.role),
                    _ => None,
                })
                .collect();
            assert_eq!(assigned, [player.role.unwrap()]);
        }
        // a lone Mafia has no partners to learn about
        assert!(
            !system_lines(&t.envelopes)
                .iter()
                .any(|l| l.starts_with("Other Mafia"))
        );
    }

    #[test]
    fn start_twice_rejected() {
        let mut room = lobby(4);
        start_game(&mut room, 1, &mut rng()).unwrap();
        let roles: Vec<_> = room.players.iter().map(|p| p.role).collect();

        assert_eq!(
            start_game(&mut room, 1, &mut rng()),
            Err(GameError::GameAlreadyStarted)
        );
        let after: Vec<_> = room.players.iter().map(|p| p.role).collect();
        assert_eq!(roles, after);
    }

    #[test]
    fn mafia_learn_each_other() {
        let mut room = lobby(8);
        let t = start_game(&mut room, 1, &mut rng()).unwrap();

        let mafia: Vec<_> = room.players.iter().filter(|p| p.is_mafia()).collect();
        assert_eq!(mafia.len(), 2);
        for (me, partner) in [(mafia[0], mafia[1]), (mafia[1], mafia[0])] {
            let expected = format!("Other Mafia(s): {}", partner.name);
            let told = private_to(&t.envelopes, me.id).into_iter().any(|m| {
                matches!(m, ServerMessage::ChatMessage(c) if c.text == expected)
            });
            assert!(told, "{} was not told about {}", me.name, partner.name);
        }
        let town_told = room
            .players
            .iter()
            .filter(|p| !p.is_mafia())
            .flat_map(|p| private_to(&t.envelopes, p.id))
            .any(|m| matches!(m, ServerMessage::ChatMessage(c) if c.text.starts_with("Other Mafia")));
        assert!(!town_told);
    }

    #[test]
    fn night_entry_announces_phase() {
        let mut room = lobby(4);
        let t = start_game(&mut room, 1, &mut rng()).unwrap();
        let tail: Vec<_> = t.envelopes.iter().rev().take(3).collect();
        assert_eq!(
            tail[0],
            &Envelope::announce("Night has fallen. Mafia, make your move!")
        );
        assert_eq!(
            tail[1].msg,
            ServerMessage::PhaseChanged(PhaseChangedMsg {
                phase: Phase::Night
            })
        );
        assert!(matches!(tail[2].msg, ServerMessage::RoomUpdate(_)));
    }

    #[test]
    fn night_kill_then_day() {
        // P1 Mafia, P2 Detective, P3 Doctor, P4 Jester, P5 Villager
        let mut room = room_with_roles(&[
            Role::Mafia,
            Role::Detective,
            Role::Doctor,
            Role::Jester,
            Role::Villager,
        ]);
        submit_night_action(&mut room, 1, 4).unwrap();

        let t = advance(&mut room);

        assert_eq!(room.phase, Phase::Day);
        assert_eq!(t.next, Some(Phase::Day));
        assert!(!room.player(4).unwrap().alive);
        let deaths = system_lines(&t.envelopes)
            .into_iter()
            .filter(|l| *l == "P4 was killed during the night.")
            .count();
        assert_eq!(deaths, 1);
    }

    #[test]
    fn night_kill_reaching_parity_ends_game() {
        let mut room =
            room_with_roles(&[Role::Mafia, Role::Detective, Role::Doctor, Role::Jester]);
        submit_night_action(&mut room, 1, 2).unwrap();

        let t = advance(&mut room);

        assert_eq!(room.phase, Phase::Ended);
        assert_eq!(room.winner, Some(Winner::Mafia));
        assert_eq!(t.next, None);
        assert!(t.envelopes.contains(&Envelope::room(ServerMessage::GameOver(
            GameOverMsg {
                winner: Winner::Mafia
            }
        ))));
    }

    #[test]
    fn voting_out_last_mafia_wins_for_villagers() {
        let mut room =
            room_with_roles(&[Role::Mafia, Role::Detective, Role::Doctor, Role::Villager]);
        room.phase = Phase::Day;
        for voter in 2..=4 {
            submit_vote(&mut room, voter, 1).unwrap();
        }

        let t = advance(&mut room);

        assert_eq!(room.winner, Some(Winner::Villagers));
        assert_eq!(room.phase, Phase::Ended);
        assert!(system_lines(&t.envelopes).contains(&"Villagers win!"));
    }

    #[test]
    fn jester_voted_out_wins_outright() {
        let mut room = room_with_roles(&[
            Role::Mafia,
            Role::Detective,
            Role::Doctor,
            Role::Jester,
            Role::Villager,
        ]);
        room.phase = Phase::Day;
        for voter in [1, 2, 3] {
            submit_vote(&mut room, voter, 4).unwrap();
        }

        let t = advance(&mut room);

        assert_eq!(room.winner, Some(Winner::Jester));
        assert_eq!(t.next, None);
        assert_eq!(
            t.envelopes.last().map(|e| &e.msg),
            Some(&ServerMessage::PhaseChanged(PhaseChangedMsg {
                phase: Phase::Ended
            }))
        );
    }

    #[test]
    fn jester_win_beats_mafia_parity() {
        let mut room =
            room_with_roles(&[Role::Mafia, Role::Jester, Role::Villager, Role::Villager]);
        room.phase = Phase::Day;
        room.player_mut(4).unwrap().alive = false;
        submit_vote(&mut room, 1, 2).unwrap();
        submit_vote(&mut room, 3, 2).unwrap();

        let t = advance(&mut room);

        // one Mafia against one Villager would also be a Mafia win
        assert_eq!(room.winner, Some(Winner::Jester));
        assert!(system_lines(&t.envelopes).contains(&"Jester wins!"));
        assert!(!system_lines(&t.envelopes).contains(&"Mafia wins!"));
        assert!(t.envelopes.iter().any(|e| e.msg
            == ServerMessage::GameOver(GameOverMsg {
                winner: Winner::Jester
            })));
    }

    #[test]
    fn tied_day_returns_to_night_with_votes_cleared() {
        let mut room = room_with_roles(&[
            Role::Mafia,
            Role::Detective,
            Role::Doctor,
            Role::Jester,
            Role::Villager,
            Role::Villager,
        ]);
        room.phase = Phase::Day;
        submit_vote(&mut room, 1, 5).unwrap();
        submit_vote(&mut room, 2, 5).unwrap();
        submit_vote(&mut room, 3, 6).unwrap();
        submit_vote(&mut room, 4, 6).unwrap();

        let t = advance(&mut room);

        assert_eq!(room.phase, Phase::Night);
        assert_eq!(t.next, Some(Phase::Night));
        assert!(room.actions.votes.is_empty());
        assert!(room.players.iter().all(|p| p.alive));
    }

    #[test]
    fn ended_and_waiting_rooms_do_not_advance() {
        let mut room = lobby(4);
        assert_eq!(advance(&mut room), Transition::idle());

        let mut ended =
            room_with_roles(&[Role::Mafia, Role::Detective, Role::Doctor, Role::Jester]);
        ended.phase = Phase::Ended;
        let before = ended.clone().view();
        assert_eq!(advance(&mut ended), Transition::idle());
        assert_eq!(ended.view(), before);
    }

    #[test]
    fn actions_after_game_over_rejected() {
        let mut room =
            room_with_roles(&[Role::Mafia, Role::Detective, Role::Doctor, Role::Jester]);
        room.phase = Phase::Ended;
        assert!(matches!(
            submit_night_action(&mut room, 1, 2),
            Err(GameError::WrongPhase { .. })
        ));
        assert!(matches!(
            submit_vote(&mut room, 2, 1),
            Err(GameError::WrongPhase { .. })
        ));
    }
}
