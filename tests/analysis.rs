//! End-to-end coaching pipeline behavior, minus the network
//!
//! Exercises the request-classification and parsing path a real session
//! takes, plus persistence semantics over an in-memory database.

use playcoach_gateway::analysis::parser;
use playcoach_gateway::analysis::{AnalysisView, Game, ResponseKind};
use playcoach_gateway::db::{self, AnalysisRepo};

const MODEL_REPLY: &str = "\
Your buildup play is too slow and predictable.
- Tip: play one-touch passes under pressure
- Tip: switch the play to the weak side early
- Drill: practice 4v2 rondos for ten minutes daily
- Drill: train driven passes against a wall
Overall performance score: 72%";

#[test]
fn detailed_request_runs_full_parse() {
    let question = "My possession keeps breaking down, give me a detailed analysis of my play";
    assert!(parser::wants_detail(question));

    let result = parser::parse_detailed(MODEL_REPLY);

    assert_eq!(result.top_tips.len(), 2);
    assert_eq!(result.drills.len(), 2);
    assert!(result.drills[0].contains("rondos"));
    assert_eq!(result.estimated_score, Some(0.72));
    assert_eq!(result.rating, Some(7.5));
    assert!(result.explanation.contains("buildup play"));
    assert_eq!(result.response_kind, ResponseKind::Detailed);
    assert!(result.error.is_none());
}

#[test]
fn casual_request_stays_simple() {
    let question = "I keep dying to ganks in the mid lane";
    assert!(!parser::wants_detail(question));

    let reply = "Ward the river earlier. Track the enemy jungler's first clear. \
                 Back off when your lane is pushed. Also consider your item timing.";
    let result = parser::parse_simple(reply);

    assert!(result.top_tips.is_empty());
    assert!(result.drills.is_empty());
    assert_eq!(result.estimated_score, None);
    assert_eq!(result.rating, None);
    // Summary is capped at three sentences
    assert_eq!(result.explanation.matches('.').count(), 3);
    assert!(!result.explanation.contains("item timing"));
}

#[test]
fn unscored_reply_gets_sentiment_fallback() {
    let reply = "- Tip: good rotations, keep improving your map awareness";
    let result = parser::parse_detailed(reply);

    // Positive sentiment, no negative words
    let score = result.estimated_score.unwrap();
    assert!((score - 0.7).abs() < 1e-9);
    assert_eq!(result.rating, Some(7.3));
}

#[test]
fn stored_view_survives_a_read_cycle() {
    let pool = db::init_memory().unwrap();
    let repo = AnalysisRepo::new(pool, 24, 10);

    let result = parser::parse_detailed(MODEL_REPLY);
    let view = result.to_view();
    repo.save("player-9", "detailed analysis please", Game::Fifa, &view)
        .unwrap();

    let records = repo.list_recent("player-9", Game::Fifa, 5).unwrap();
    assert_eq!(records.len(), 1);

    let stored: &AnalysisView = &records[0].analysis;
    assert_eq!(stored.response_type, ResponseKind::Detailed);
    assert_eq!(stored.confidence, Some(0.72));
    assert_eq!(stored.rating, Some(7.5));
    assert_eq!(stored.top_tips, view.top_tips);
    assert_eq!(stored.training_drills, view.training_drills);
}

#[test]
fn history_is_capped_at_retention_limit() {
    let pool = db::init_memory().unwrap();
    let repo = AnalysisRepo::new(pool, 24, 10);

    let view = parser::parse_simple("One sentence of advice.").to_view();
    for i in 0..15 {
        repo.save("player-9", &format!("question {i}"), Game::Lol, &view)
            .unwrap();
    }

    let records = repo.list_recent("player-9", Game::Lol, 100).unwrap();
    assert_eq!(records.len(), 10);
    // Oldest five were evicted
    assert_eq!(records[0].user_text, "question 14");
    assert_eq!(records[9].user_text, "question 5");
}
