use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::http_client::Transport;
use crate::state::{
    AccuracyPayload, AccuracyRecord, AccuracySummary, CooccurrenceStats, DrawRecord, HistoryPage,
    Prediction, PredictionRecord, RankedSet, StatsSummary, UNKNOWN_NUMBER,
};

pub const LATEST_PREDICTION_PATH: &str = "predictions/latest";
pub const ACCURACY_PATH: &str = "predictions/accuracy";
pub const STATS_SUMMARY_PATH: &str = "stats/summary";
pub const COOCCURRENCE_PATH: &str = "stats/cooccurrence";
pub const HISTORY_PATH: &str = "crawler/history";
pub const CRAWLER_RUN_PATH: &str = "crawler/run";

fn variant_query(variant: &str) -> Vec<(&'static str, String)> {
    vec![("type", variant.to_string())]
}

pub fn fetch_latest_prediction(
    api: &dyn Transport,
    variant: &str,
) -> Result<Option<PredictionRecord>> {
    let body = api
        .get(LATEST_PREDICTION_PATH, &variant_query(variant))
        .context("latest prediction request failed")?;
    parse_latest_prediction_json(&body)
}

pub fn fetch_accuracy(api: &dyn Transport, variant: &str) -> Result<AccuracyPayload> {
    let body = api
        .get(ACCURACY_PATH, &variant_query(variant))
        .context("accuracy request failed")?;
    parse_accuracy_json(&body)
}

pub fn fetch_stats_summary(api: &dyn Transport, variant: &str) -> Result<StatsSummary> {
    let body = api
        .get(STATS_SUMMARY_PATH, &variant_query(variant))
        .context("stats summary request failed")?;
    parse_stats_summary_json(&body)
}

pub fn fetch_cooccurrence(api: &dyn Transport, variant: &str) -> Result<CooccurrenceStats> {
    let body = api
        .get(COOCCURRENCE_PATH, &variant_query(variant))
        .context("cooccurrence request failed")?;
    parse_cooccurrence_json(&body)
}

pub fn fetch_history(
    api: &dyn Transport,
    variant: &str,
    page: u32,
    limit: u32,
) -> Result<HistoryPage> {
    let mut query = variant_query(variant);
    query.push(("page", page.to_string()));
    query.push(("limit", limit.to_string()));
    let body = api
        .get(HISTORY_PATH, &query)
        .context("draw history request failed")?;
    parse_history_json(&body)
}

/// Asks the backend to re-crawl. The response body carries no contract.
pub fn submit_crawl(api: &dyn Transport, variant: &str) -> Result<()> {
    api.post(CRAWLER_RUN_PATH, &variant_query(variant))
        .context("crawler run request failed")?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    data: Option<Vec<Value>>,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    latest_draw: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct AccuracyResponse {
    #[serde(default)]
    total_predictions: Option<u64>,
    #[serde(default)]
    verified_count: Option<u64>,
    #[serde(default)]
    avg_matches: Option<f64>,
    #[serde(default)]
    history: Option<Vec<Value>>,
}

pub fn parse_history_json(raw: &str) -> Result<HistoryPage> {
    let Some(resp) = parse_nullable::<HistoryResponse>(raw).context("invalid history json")?
    else {
        return Ok(HistoryPage::default());
    };
    let records = resp
        .data
        .unwrap_or_default()
        .iter()
        .filter_map(draw_from_value)
        .collect();
    Ok(HistoryPage {
        records,
        total: resp.total.unwrap_or(0),
        latest: resp.latest_draw.as_ref().and_then(draw_from_value),
    })
}

pub fn parse_accuracy_json(raw: &str) -> Result<AccuracyPayload> {
    let Some(resp) = parse_nullable::<AccuracyResponse>(raw).context("invalid accuracy json")?
    else {
        return Ok(AccuracyPayload::default());
    };
    let history = resp
        .history
        .unwrap_or_default()
        .iter()
        .filter_map(accuracy_record_from_value)
        .collect();
    Ok(AccuracyPayload {
        summary: AccuracySummary {
            total_predictions: resp.total_predictions.unwrap_or(0),
            verified_count: resp.verified_count.unwrap_or(0),
            avg_matches: resp.avg_matches.unwrap_or(0.0),
        },
        history,
    })
}

pub fn parse_latest_prediction_json(raw: &str) -> Result<Option<PredictionRecord>> {
    let Some(root) = parse_nullable::<Value>(raw).context("invalid prediction json")? else {
        return Ok(None);
    };
    if !root.is_object() {
        return Ok(None);
    }
    let target_period = period_from_value(root.get("target_period").unwrap_or(&Value::Null));
    let confidence = root.get("confidence").unwrap_or(&Value::Null);
    let prediction = prediction_from_parts(
        root.get("predicted_numbers").unwrap_or(&Value::Null),
        root.get("prediction_sets").unwrap_or(&Value::Null),
        confidence,
    );
    let locked_note = match confidence {
        Value::String(text) if text.trim().parse::<f64>().is_err() => Some(text.clone()),
        _ => None,
    };
    let message = root
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|msg| !msg.is_empty());
    Ok(Some(PredictionRecord {
        target_period,
        prediction,
        locked_note,
        message,
    }))
}

pub fn parse_stats_summary_json(raw: &str) -> Result<StatsSummary> {
    Ok(parse_nullable::<StatsSummary>(raw)
        .context("invalid stats summary json")?
        .unwrap_or_default())
}

pub fn parse_cooccurrence_json(raw: &str) -> Result<CooccurrenceStats> {
    Ok(parse_nullable::<CooccurrenceStats>(raw)
        .context("invalid cooccurrence json")?
        .unwrap_or_default())
}

fn parse_nullable<T: DeserializeOwned>(raw: &str) -> Result<Option<T>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(trimmed)?))
}

fn draw_from_value(value: &Value) -> Option<DrawRecord> {
    let obj = value.as_object()?;
    let period = period_from_value(obj.get("draw_period").unwrap_or(&Value::Null));
    if period.is_empty() {
        return None;
    }
    let amount = |key: &str| obj.get(key).and_then(amount_from_value);
    let winners = |key: &str| {
        obj.get(key)
            .and_then(Value::as_u64)
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
            .unwrap_or(0)
    };
    Some(DrawRecord {
        period,
        draw_date: obj
            .get("draw_date")
            .and_then(Value::as_str)
            .and_then(parse_draw_date),
        numbers: balls_from_value(obj.get("numbers").unwrap_or(&Value::Null)),
        jackpot_value: amount("jackpot_value"),
        jackpot_winners: winners("jackpot_winners"),
        jackpot2_value: amount("jackpot2_value"),
        jackpot2_winners: winners("jackpot2_winners"),
        first_prize_value: amount("first_prize_value"),
        first_prize_winners: winners("first_prize_winners"),
        second_prize_value: amount("second_prize_value"),
        second_prize_winners: winners("second_prize_winners"),
        third_prize_value: amount("third_prize_value"),
        third_prize_winners: winners("third_prize_winners"),
    })
}

fn accuracy_record_from_value(value: &Value) -> Option<AccuracyRecord> {
    let obj = value.as_object()?;
    let period = period_from_value(obj.get("period").unwrap_or(&Value::Null));
    if period.is_empty() {
        return None;
    }
    let confidence_value = obj.get("confidence").unwrap_or(&Value::Null);
    let actual = obj
        .get("actual")
        .filter(|v| v.is_array())
        .map(balls_from_value);
    Some(AccuracyRecord {
        period,
        prediction: prediction_from_parts(
            obj.get("predicted").unwrap_or(&Value::Null),
            obj.get("prediction_sets").unwrap_or(&Value::Null),
            confidence_value,
        ),
        confidence: number_from_value(confidence_value).unwrap_or(0.0),
        actual,
    })
}

/// A non-empty `prediction_sets` array wins; otherwise the flat number list
/// with the scalar confidence is the whole prediction.
fn prediction_from_parts(predicted: &Value, sets: &Value, confidence: &Value) -> Prediction {
    let sets: Vec<RankedSet> = sets
        .as_array()
        .map(|items| items.iter().filter_map(ranked_set_from_value).collect())
        .unwrap_or_default();
    if sets.is_empty() {
        Prediction::Legacy {
            numbers: balls_from_value(predicted),
            confidence: number_from_value(confidence).unwrap_or(0.0),
        }
    } else {
        Prediction::Ensemble { sets }
    }
}

fn ranked_set_from_value(value: &Value) -> Option<RankedSet> {
    let numbers = value.get("numbers").filter(|v| v.is_array())?;
    Some(RankedSet {
        numbers: balls_from_value(numbers),
        confidence: value
            .get("confidence")
            .and_then(number_from_value)
            .unwrap_or(0.0),
    })
}

fn balls_from_value(value: &Value) -> Vec<i32> {
    value
        .as_array()
        .map(|items| items.iter().map(ball_from_value).collect())
        .unwrap_or_default()
}

/// Masked (`"?"`), null or otherwise unreadable slots become the sentinel.
fn ball_from_value(value: &Value) -> i32 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .unwrap_or(UNKNOWN_NUMBER),
        Value::String(text) => text.trim().parse::<i32>().unwrap_or(UNKNOWN_NUMBER),
        _ => UNKNOWN_NUMBER,
    }
}

fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(text) => text.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    }
}

fn amount_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn period_from_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn parse_draw_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn masked_and_null_balls_become_sentinel() {
        let balls = balls_from_value(&json!([3, "?", null, "17", 4.5]));
        assert_eq!(
            balls,
            vec![3, UNKNOWN_NUMBER, UNKNOWN_NUMBER, 17, UNKNOWN_NUMBER]
        );
    }

    #[test]
    fn period_accepts_string_and_integer() {
        assert_eq!(period_from_value(&json!("01234")), "01234");
        assert_eq!(period_from_value(&json!(101)), "101");
        assert_eq!(period_from_value(&Value::Null), "");
    }

    #[test]
    fn draw_date_reads_date_prefix() {
        assert_eq!(
            parse_draw_date("2024-05-01T00:00:00"),
            NaiveDate::from_ymd_opt(2024, 5, 1)
        );
        assert_eq!(parse_draw_date("bad"), None);
    }

    #[test]
    fn oversized_winner_counts_saturate() {
        let draw = draw_from_value(&json!({
            "draw_period": "0126",
            "jackpot_winners": 5_000_000_000u64,
            "first_prize_winners": 42,
            "second_prize_winners": -1,
        }))
        .expect("draw parses");
        assert_eq!(draw.jackpot_winners, u32::MAX);
        assert_eq!(draw.first_prize_winners, 42);
        assert_eq!(draw.second_prize_winners, 0);
    }
}
