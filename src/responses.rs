use async_trait::async_trait;

use crate::api::models::HistoryTurn;
use crate::error::Result;
use crate::llm::AdviceProvider;

/// Canned Hindi replies keyed on a couple of common questions.
pub fn keyword_reply(message: &str) -> &'static str {
    let message = message.to_lowercase();

    if message.contains("धान") {
        "धान में रोग का इलाज नीम के छिड़काव से करें।"
    } else if message.contains("मंडी भाव") {
        "आज मंडी में गेहूं का भाव ₹2150 प्रति क्विंटल है।"
    } else {
        "आपका सवाल समझ नहीं आया। कृपया दोबारा पूछें।"
    }
}

/// Offline advice backend; ignores history and never fails.
pub struct KeywordResponder;

#[async_trait]
impl AdviceProvider for KeywordResponder {
    async fn generate(&self, query: &str, _history: &[HistoryTurn]) -> Result<String> {
        Ok(keyword_reply(query).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_known_keywords() {
        assert_eq!(keyword_reply("धान में कीड़े"), "धान में रोग का इलाज नीम के छिड़काव से करें।");
        assert_eq!(keyword_reply("आज का मंडी भाव?"), "आज मंडी में गेहूं का भाव ₹2150 प्रति क्विंटल है।");
    }

    #[test]
    fn paddy_wins_over_market_rate() {
        assert_eq!(keyword_reply("धान का मंडी भाव"), "धान में रोग का इलाज नीम के छिड़काव से करें।");
    }

    #[tokio::test]
    async fn unknown_questions_get_the_retry_prompt() {
        let reply = KeywordResponder.generate("What about soybean?", &[]).await.unwrap();
        assert_eq!(reply, "आपका सवाल समझ नहीं आया। कृपया दोबारा पूछें।");
    }
}
