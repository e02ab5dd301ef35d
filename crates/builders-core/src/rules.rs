//! What a turn looks like.
//!
//! The rules only read the board. `execute_turn` returns a validated [`Play`]
//! and the scheduler is the one that writes it back.

use crate::board::{missing_state, BuildersBoard};
use crate::config::GameConfig;
use crate::error::{BadPlay, TurnError};
use crate::playable::{PlayType, Playable};
use crate::player::{Player, PlayerId, PlayerState};
use std::fmt::Write;
use tracing::debug;

/// A validated choice of card, ready to be applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Play {
    /// Position of the card in the player's hand
    pub hand_index: usize,
    pub card: Playable,
}

/// Rules of The Builders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildersRules {
    hand_size: usize,
    floors_to_win: u32,
}

impl BuildersRules {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            hand_size: config.hand_size,
            floors_to_win: config.floors_to_win,
        }
    }

    pub fn floors_to_win(&self) -> u32 {
        self.floors_to_win
    }

    /// Whether the player may play this card at all.
    ///
    /// Accidents are not considered here; see [`PlayerState::is_suppressed`].
    pub fn can_play(&self, _board: &BuildersBoard, _player: &Player, playable: &Playable) -> bool {
        match playable.play_type() {
            PlayType::Worker => true,
            PlayType::Accident => true,
            PlayType::Floor => true,
        }
    }

    /// Give every player an empty site and deal their hands.
    ///
    /// Panics if called twice.
    pub fn setup_game(&self, board: &mut BuildersBoard) {
        assert!(board.states().next().is_none(), "game is already set up");
        board.deal(self.hand_size);
    }

    pub fn is_game_over(&self, board: &BuildersBoard) -> bool {
        self.winner(board).is_some()
    }

    /// The player with the tallest finished hotel, if any hotel is finished
    pub fn winner(&self, board: &BuildersBoard) -> Option<PlayerId> {
        board
            .players()
            .iter()
            .filter_map(|p| board.state(p.id).map(|s| (p.id, s.hotel.floors)))
            .filter(|&(_, floors)| floors >= self.floors_to_win)
            .max_by_key(|&(_, floors)| floors)
            .map(|(id, _)| id)
    }

    /// Indices of hand cards the player could play right now
    pub fn legal_plays(&self, board: &BuildersBoard, player: &Player) -> Result<Vec<usize>, TurnError> {
        let state = board.state(player.id).ok_or_else(|| missing_state(player.id))?;

        Ok(state
            .hand
            .iter()
            .enumerate()
            .filter(|(_, card)| !state.is_suppressed(card) && self.can_play(board, player, card))
            .map(|(i, _)| i)
            .collect())
    }

    /// Run one turn for `player`: prompt, wait, validate.
    pub async fn execute_turn(&self, board: &BuildersBoard, player: &Player) -> Result<Play, TurnError> {
        let state = board.state(player.id).ok_or_else(|| missing_state(player.id))?;
        let legal = self.legal_plays(board, player)?;
        let dialog = self.render_dialog(player, state, &legal);

        let response = board.request_input(player, &dialog).await?;
        debug!(player = player.id, response = %response.trim(), "Received response");

        self.validate(board, player, &response)
    }

    /// Check a raw response against the player's hand and accidents.
    pub fn validate(&self, board: &BuildersBoard, player: &Player, response: &str) -> Result<Play, TurnError> {
        let state = board.state(player.id).ok_or_else(|| missing_state(player.id))?;

        let trimmed = response.trim();
        let hand_index: usize = trimmed
            .parse()
            .map_err(|_| BadPlay::Unparseable(trimmed.to_string()))?;

        let card = state.hand.get(hand_index).ok_or(BadPlay::OutOfRange {
            index: hand_index,
            hand_size: state.hand.len(),
        })?;

        if !self.can_play(board, player, card) {
            return Err(BadPlay::Illegal {
                player: player.id,
                card: card.clone(),
            }
            .into());
        }

        if let Some(accident) = state.suppressing_accident(card) {
            return Err(BadPlay::Suppressed {
                card: card.clone(),
                accident: accident.kind,
            }
            .into());
        }

        Ok(Play {
            hand_index,
            card: card.clone(),
        })
    }

    fn render_dialog(&self, player: &Player, state: &PlayerState, legal: &[usize]) -> String {
        let mut dialog = String::new();

        let _ = writeln!(
            dialog,
            "Your turn, {}. Hotel: {}/{} floors, crew of {} ({} working).",
            player.name,
            state.hotel.floors,
            self.floors_to_win,
            state.crew.len(),
            state.working_crew().count()
        );

        let accidents: Vec<String> = state
            .active_accidents()
            .map(|a| format!("{} ({} turns left)", a.kind, a.turns_remaining()))
            .collect();
        if !accidents.is_empty() {
            let _ = writeln!(dialog, "Accidents: {}", accidents.join(", "));
        }

        let _ = writeln!(dialog, "Your hand:");
        for (i, card) in state.hand.iter().enumerate() {
            let note = if legal.contains(&i) { "" } else { " (out of play)" };
            let _ = writeln!(dialog, "  [{}] {}{}", i, card, note);
        }
        dialog.push_str("Pick a card by number:");

        dialog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accident::{Accident, AccidentType};
    use crate::interfacer::{InputError, UserInterfacer};
    use crate::playable::{SkillType, Worker};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    struct Silent;

    #[async_trait]
    impl UserInterfacer for Silent {
        fn send(&self, _message: &str) {}

        async fn request_input(&self, _dialog: &str) -> Result<String, InputError> {
            Err(InputError::ChannelClosed)
        }
    }

    fn dealt_board() -> BuildersBoard {
        let mut board = BuildersBoard::new(GameConfig::default().with_seed(3));
        board.setup_players(
            (0..2)
                .map(|i| Player::new(i, format!("P{}", i), Arc::new(Silent)))
                .collect(),
        );
        let rules = *board.rules();
        rules.setup_game(&mut board);
        board
    }

    fn set_hand(board: &mut BuildersBoard, id: PlayerId, hand: Vec<Playable>) {
        board.state_mut(id).unwrap().hand = hand;
    }

    #[test]
    fn test_setup_deals_full_hands() {
        let board = dealt_board();
        for player in board.players() {
            let state = board.state(player.id).unwrap();
            assert_eq!(state.hand.len(), 5);
            assert!(state.accidents.is_empty());
            assert!(state.crew.is_empty());
            assert_eq!(state.hotel.floors, 0);
        }
    }

    #[test]
    #[should_panic(expected = "already set up")]
    fn test_setup_twice_panics() {
        let mut board = dealt_board();
        let rules = *board.rules();
        rules.setup_game(&mut board);
    }

    #[test]
    fn test_game_over_is_pure() {
        let mut board = dealt_board();
        let rules = *board.rules();

        assert!(!rules.is_game_over(&board));
        assert!(!rules.is_game_over(&board));

        board.state_mut(1).unwrap().hotel.floors = 5;
        assert!(rules.is_game_over(&board));
        assert!(rules.is_game_over(&board));
        assert_eq!(rules.winner(&board), Some(1));
    }

    #[test]
    fn test_validate_rejects_garbage() {
        let board = dealt_board();
        let rules = *board.rules();
        let player = board.active_player().clone();

        assert_eq!(
            rules.validate(&board, &player, "hello"),
            Err(TurnError::BadPlay(BadPlay::Unparseable("hello".into())))
        );
        assert_eq!(
            rules.validate(&board, &player, "9"),
            Err(TurnError::BadPlay(BadPlay::OutOfRange {
                index: 9,
                hand_size: 5
            }))
        );
    }

    #[test]
    fn test_validate_rejects_struck_worker() {
        let mut board = dealt_board();
        let metal = Playable::Worker(Worker::new(SkillType::MetalWorker));
        set_hand(&mut board, 0, vec![metal.clone(), Playable::Floor]);
        board
            .state_mut(0)
            .unwrap()
            .accidents
            .push(Accident::new(AccidentType::Strike(SkillType::MetalWorker)));

        let rules = *board.rules();
        let player = board.active_player().clone();

        assert_eq!(
            rules.validate(&board, &player, "0"),
            Err(TurnError::BadPlay(BadPlay::Suppressed {
                card: metal,
                accident: AccidentType::Strike(SkillType::MetalWorker),
            }))
        );
        assert_eq!(
            rules.validate(&board, &player, " 1\n"),
            Ok(Play {
                hand_index: 1,
                card: Playable::Floor
            })
        );
        assert_eq!(rules.legal_plays(&board, &player).unwrap(), vec![1]);
    }

    #[test]
    fn test_can_play_base_types() {
        let board = dealt_board();
        let rules = *board.rules();
        let player = board.active_player().clone();

        assert!(rules.can_play(&board, &player, &Playable::Floor));
        assert!(rules.can_play(
            &board,
            &player,
            &Playable::Accident(AccidentType::Strike(SkillType::Painter))
        ));
        assert!(rules.can_play(
            &board,
            &player,
            &Playable::Worker(Worker::new(SkillType::Painter))
        ));
    }

    #[test]
    fn test_dialog_marks_out_of_play_cards() {
        let mut board = dealt_board();
        set_hand(
            &mut board,
            0,
            vec![
                Playable::Worker(Worker::new(SkillType::Painter)),
                Playable::Floor,
            ],
        );
        board
            .state_mut(0)
            .unwrap()
            .accidents
            .push(Accident::new(AccidentType::Strike(SkillType::Painter)));

        let rules = *board.rules();
        let player = board.active_player().clone();
        let legal = rules.legal_plays(&board, &player).unwrap();
        let dialog = rules.render_dialog(&player, board.state(0).unwrap(), &legal);

        assert!(dialog.contains("[0] Worker: painter (skill 1.0) (out of play)"));
        assert!(dialog.contains("[1] Prefab floor\n"));
        assert!(dialog.contains("painter strike (3 turns left)"));
    }

    #[tokio::test]
    async fn test_closed_channel_is_game_death() {
        let board = dealt_board();
        let rules = *board.rules();
        let player = board.active_player().clone();

        assert_eq!(
            rules.execute_turn(&board, &player).await,
            Err(TurnError::GameDeath(crate::error::DeathCause::Disconnected))
        );
    }
}
