//! Offline answer generation.
//!
//! The engine stops at a fact summary; something has to turn it into a
//! reply. Without a language model wired in, the CLI renders the summary
//! through a fixed template.

use async_trait::async_trait;
use slotwise_core::{Directive, FactSummary, GenerationError, Responder, Tone};

const GREETING: &str = "您好！我是法律咨询助手，请描述您遇到的法律问题。";
const DECLINE: &str = "抱歉，这个问题不在我能咨询的范围内。请描述您遇到的法律问题。";

/// Tone-specific opening followed by the summary's prompt body.
pub struct TemplateResponder;

#[async_trait]
impl Responder for TemplateResponder {
    fn name(&self) -> &str {
        "template"
    }

    async fn respond(&self, summary: &FactSummary) -> Result<String, GenerationError> {
        let opening = match summary.tone {
            Tone::Professional => "根据您提供的信息：",
            Tone::Empathetic => "理解您现在的心情，我们一起梳理一下：",
            Tone::FriendlyAdvisory => "好的，结合您的情况给您一些建议：",
            Tone::SummarizeAndSolve => "我们聊了不少，先总结一下您的情况：",
        };
        Ok(format!("{opening}\n{}", summary.describe()))
    }
}

/// The text to show for a directive. Ask prompts come from the engine;
/// everything else is generated here.
pub async fn reply(responder: &dyn Responder, directive: &Directive) -> Result<String, GenerationError> {
    match directive {
        Directive::Ask { prompt, .. } => Ok(prompt.clone()),
        Directive::Proceed { summary } => responder.respond(summary).await,
        Directive::Greet => Ok(GREETING.to_string()),
        Directive::Decline => Ok(DECLINE.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotwise_core::{LegalDomain, SlotKey};
    use std::collections::BTreeMap;

    fn summary(tone: Tone) -> FactSummary {
        let mut slots = BTreeMap::new();
        slots.insert(SlotKey::LegalDomain, "labor".to_string());
        slots.insert(SlotKey::Employer, "华南公司".to_string());
        FactSummary {
            domain: Some(LegalDomain::Labor),
            intent: None,
            slots,
            utterance: "三年".into(),
            query: "三年".into(),
            tone,
            bypass: None,
            snippets: vec![],
        }
    }

    #[tokio::test]
    async fn template_includes_facts_and_tone() {
        let text = TemplateResponder.respond(&summary(Tone::Empathetic)).await.unwrap();
        assert!(text.starts_with("理解您现在的心情"));
        assert!(text.contains("华南公司"));
        assert!(text.ends_with("用户问题：三年"));
    }

    #[tokio::test]
    async fn ask_replies_with_the_prompt() {
        let directive = Directive::Ask {
            slot: SlotKey::Employer,
            prompt: "您的用人单位名称是？".into(),
        };
        assert_eq!(
            reply(&TemplateResponder, &directive).await.unwrap(),
            "您的用人单位名称是？"
        );
        assert_eq!(reply(&TemplateResponder, &Directive::Greet).await.unwrap(), GREETING);
    }
}
