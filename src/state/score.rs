use super::GameEngine;
use crate::error::GameError;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Points for picking out the machine-written response
pub const CORRECT_GUESS_POINTS: u32 = 1;
/// Points an author earns for every other player who took their response for the machine's
pub const DECEPTION_POINTS: u32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseResult {
    pub index: ResponseIndex,
    pub text: String,
    pub is_llm: bool,
    pub author_id: Option<PlayerId>,
    pub votes_received: usize,
    /// Sorted by player id
    pub voters: Vec<PlayerId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlayerRoundResult {
    pub correct_guess: bool,
    pub round_points: u32,
    pub deception_points: u32,
    /// Other players who picked this player's response
    pub response_votes: usize,
    pub guessed_index: Option<ResponseIndex>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundResults {
    pub round_number: u32,
    pub llm_response_index: ResponseIndex,
    pub llm_model: String,
    pub total_players: usize,
    pub total_guesses: usize,
    pub responses: Vec<ResponseResult>,
    pub player_results: HashMap<PlayerId, PlayerRoundResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardEntry {
    pub player_id: PlayerId,
    pub name: String,
    pub score: u32,
    pub rank: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoringRules {
    pub correct_guess_points: u32,
    pub deception_points: u32,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameStats {
    pub total_rounds: u32,
    pub active_players: usize,
    pub highest_score: u32,
    pub current_leaders: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoringSummary {
    pub scoring_rules: ScoringRules,
    pub game_stats: GameStats,
}

/// Work out a round's results from its final responses and guesses.
///
/// Pure and deterministic: the same room always yields the same report.
pub fn compute_round_results(room: &Room) -> Result<RoundResults, GameError> {
    let llm_index = room
        .llm_response_index()
        .ok_or_else(|| GameError::NoLlmResponseToScore(room.id.clone()))?;

    let mut voters: HashMap<ResponseIndex, Vec<PlayerId>> = HashMap::new();
    for (guesser, index) in &room.guesses {
        voters.entry(*index).or_default().push(guesser.clone());
    }
    for list in voters.values_mut() {
        list.sort();
    }

    let mut player_results: HashMap<PlayerId, PlayerRoundResult> = room
        .players
        .keys()
        .map(|id| (id.clone(), PlayerRoundResult::default()))
        .collect();

    for (guesser, index) in &room.guesses {
        let result = player_results.entry(guesser.clone()).or_default();
        result.guessed_index = Some(*index);
        if *index == llm_index {
            result.correct_guess = true;
            result.round_points += CORRECT_GUESS_POINTS;
        }
    }

    let mut responses = Vec::with_capacity(room.responses.len());
    for response in &room.responses {
        let response_voters = voters.remove(&response.index).unwrap_or_default();

        if let (false, Some(author)) = (response.is_llm, response.author_id.as_ref()) {
            let fooled = response_voters.iter().filter(|v| *v != author).count();
            let result = player_results.entry(author.clone()).or_default();
            result.response_votes += fooled;
            result.deception_points += fooled as u32 * DECEPTION_POINTS;
            result.round_points += fooled as u32 * DECEPTION_POINTS;
        }

        responses.push(ResponseResult {
            index: response.index,
            text: response.text.clone(),
            is_llm: response.is_llm,
            author_id: response.author_id.clone(),
            votes_received: response_voters.len(),
            voters: response_voters,
        });
    }

    Ok(RoundResults {
        round_number: room.round_number,
        llm_response_index: llm_index,
        llm_model: room
            .current_prompt
            .as_ref()
            .map(|p| p.model.clone())
            .unwrap_or_default(),
        total_players: room.player_count(),
        total_guesses: room.guesses.len(),
        responses,
        player_results,
    })
}

impl GameEngine {
    /// Add this round's points to each player's score. Runs at most once per round.
    pub(super) fn score_room(&self, room: &mut Room) -> Result<(), GameError> {
        if room.scored_round == Some(room.round_number) {
            return Ok(());
        }

        let results = compute_round_results(room)?;
        for (player_id, result) in &results.player_results {
            if let Some(player) = room.players.get_mut(player_id) {
                player.score += result.round_points;
            }
        }
        room.scored_round = Some(room.round_number);

        let awarded: u32 = results.player_results.values().map(|r| r.round_points).sum();
        let correct = results
            .player_results
            .values()
            .filter(|r| r.correct_guess)
            .count();
        tracing::info!(
            room_id = %room.id,
            round = room.round_number,
            guesses = results.total_guesses,
            correct,
            awarded,
            "Round scored"
        );
        Ok(())
    }

    /// Results report for the round on display; None outside RESULTS
    pub fn get_round_results(&self, room_id: &str) -> Option<RoundResults> {
        self.store
            .with_room(room_id, |room| {
                if room.phase != GamePhase::Results {
                    return None;
                }
                match compute_round_results(room) {
                    Ok(results) => Some(results),
                    Err(e) => {
                        tracing::error!(%room_id, "Cannot build round results: {}", e);
                        None
                    }
                }
            })
            .flatten()
    }

    /// Players by descending score; ranks are positional, ties broken by name then id
    pub fn get_leaderboard(&self, room_id: &str) -> Vec<LeaderboardEntry> {
        self.store
            .with_room(room_id, |room| {
                let mut players: Vec<&Player> = room.players.values().collect();
                players.sort_by(|a, b| {
                    b.score
                        .cmp(&a.score)
                        .then_with(|| a.name.cmp(&b.name))
                        .then_with(|| a.id.cmp(&b.id))
                });
                players
                    .into_iter()
                    .enumerate()
                    .map(|(i, p)| LeaderboardEntry {
                        player_id: p.id.clone(),
                        name: p.name.clone(),
                        score: p.score,
                        rank: i + 1,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get_scoring_summary(&self, room_id: &str) -> Option<ScoringSummary> {
        self.store.with_room(room_id, |room| {
            let highest_score = room.players.values().map(|p| p.score).max().unwrap_or(0);
            let mut current_leaders: Vec<String> = room
                .players
                .values()
                .filter(|p| p.score == highest_score)
                .map(|p| p.name.clone())
                .collect();
            current_leaders.sort();

            ScoringSummary {
                scoring_rules: ScoringRules {
                    correct_guess_points: CORRECT_GUESS_POINTS,
                    deception_points: DECEPTION_POINTS,
                    description: format!(
                        "{} point for spotting the AI response; {} points for each other player who picks your response as the AI",
                        CORRECT_GUESS_POINTS, DECEPTION_POINTS
                    ),
                },
                game_stats: GameStats {
                    total_rounds: room.round_number,
                    active_players: room.player_count(),
                    highest_score,
                    current_leaders,
                },
            }
        })
    }
}
