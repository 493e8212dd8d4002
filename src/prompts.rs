//! Fixed prompt templates for keyword extraction.
//!
//! Every template is a system instruction, a worked example spoken by the
//! assistant, and the article text wrapped in a short user instruction. The
//! templates differ only in their wording.

use crate::api::ChatMessage;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

const GENERIC_SYSTEM: &str = "You are a skilled AI specializing in distilling key information into key words.
Based on the following, identify the main points discussed or raised and list your words.
the words must contain the most important idea, discovery, or topic that is crucial to the nature of the discussion.
Your goal is to provide a list of words that are key to your conversation. don't include unimportant, common words in your list";

const GENERIC_EXEMPLAR: &str = "Avoid using verbs or adjectives in the extracted keywords, focus on nouns and key concepts.
Importance refers to the degree to which the content is the most essential part of the content.
Among these, unique and uncommon words are judged to be more important. For example, if you extract the four keywords 'Apple', 'mixed reality', 'headset', and 'Vision Pro' from the sentence 'Apple has launched the mixed reality headset 'Vision Pro'' and list them in order, the most important one is It must be 'Vision Pro', 'Mixed Reality', 'Apple', or 'Headset'.
the words list should be separated by ',' and Sort them in order of importance.";

const GENERIC_USER_PREFIX: &str = "Extract important keywords from the news: ";
const GENERIC_USER_SUFFIX: &str =
    "\nAvoid using verbs or adjectives in the extracted keywords, focus on nouns and key concepts.";

const COMPANY_TECH_SYSTEM: &str = "You are an analyst who reads Korean IT and science news.
Find every company or organization and every technology or product that the article talks about.
List only names that actually appear in the article and do not explain them.
Answer in Korean using exactly two labelled lines: '기업:' for companies and organizations, '기술:' for technologies.";

const COMPANY_TECH_EXEMPLAR: &str = "For example, from the sentence '애플이 혼합현실 헤드셋 비전 프로를 출시했다' the answer is:
기업: 애플
기술: 혼합현실 헤드셋, 비전 프로
Names on the same line are separated by ','.";

const COMPANY_TECH_USER_PREFIX: &str = "다음 뉴스에서 기업/기관과 기술을 추출해 주세요: ";

const COMPANY_TECH_EVENT_SYSTEM: &str = "You are an analyst who reads Korean IT and science news.
Find the companies or organizations, the technologies or products, and the events (conferences, launches, deals, regulations) that the article talks about.
Write each name in Korean followed by its English name in parentheses.
Add the official website of each company, product or event after ' - ' when one exists; never invent a link.
Answer using exactly three labelled lines: '기업:', '기술:' and '이벤트:'.";

const COMPANY_TECH_EVENT_EXEMPLAR: &str = "For example, from the sentence '애플이 WWDC 2023에서 혼합현실 헤드셋 비전 프로를 공개했다' the answer is:
기업: 애플 (Apple) - https://www.apple.com
기술: 비전 프로 (Vision Pro) - https://www.apple.com/apple-vision-pro/
이벤트: WWDC 2023 (Worldwide Developers Conference 2023) - https://developer.apple.com/wwdc23/
Entries on the same line are separated by ','.";

const COMPANY_TECH_EVENT_USER_PREFIX: &str = "다음 뉴스에서 기업, 기술, 이벤트를 추출해 주세요: ";

/// Shape of the answer a template asks the model for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerFormat {
    /// One delimited list of terms.
    Delimited,
    /// One `label: term, term` line per kind of name.
    LabelledLines,
}

/// The keyword question asked about each article.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PromptTemplate {
    /// Salient nouns and key concepts, most important first.
    #[default]
    #[value(alias = "generic")]
    GenericKeywords,
    /// Companies/organizations and technologies, Korean-labelled lines.
    CompanyTech,
    /// Companies, technologies and events with bilingual names and official links.
    CompanyTechEvent,
}

impl PromptTemplate {
    pub fn name(self) -> &'static str {
        match self {
            PromptTemplate::GenericKeywords => "generic-keywords",
            PromptTemplate::CompanyTech => "company-tech",
            PromptTemplate::CompanyTechEvent => "company-tech-event",
        }
    }

    pub fn system_prompt(self) -> &'static str {
        match self {
            PromptTemplate::GenericKeywords => GENERIC_SYSTEM,
            PromptTemplate::CompanyTech => COMPANY_TECH_SYSTEM,
            PromptTemplate::CompanyTechEvent => COMPANY_TECH_EVENT_SYSTEM,
        }
    }

    pub fn exemplar(self) -> &'static str {
        match self {
            PromptTemplate::GenericKeywords => GENERIC_EXEMPLAR,
            PromptTemplate::CompanyTech => COMPANY_TECH_EXEMPLAR,
            PromptTemplate::CompanyTechEvent => COMPANY_TECH_EVENT_EXEMPLAR,
        }
    }

    pub fn answer_format(self) -> AnswerFormat {
        match self {
            PromptTemplate::GenericKeywords => AnswerFormat::Delimited,
            PromptTemplate::CompanyTech | PromptTemplate::CompanyTechEvent => {
                AnswerFormat::LabelledLines
            }
        }
    }

    /// The user turn carrying the article text.
    pub fn user_prompt(self, article_text: &str) -> String {
        match self {
            PromptTemplate::GenericKeywords => {
                format!("{GENERIC_USER_PREFIX}{article_text}{GENERIC_USER_SUFFIX}")
            }
            PromptTemplate::CompanyTech => format!("{COMPANY_TECH_USER_PREFIX}{article_text}"),
            PromptTemplate::CompanyTechEvent => {
                format!("{COMPANY_TECH_EVENT_USER_PREFIX}{article_text}")
            }
        }
    }

    /// Full message sequence sent to the completion service.
    ///
    /// The generic template puts the worked example after the article, the
    /// company templates lead with it.
    pub fn messages(self, article_text: &str) -> Vec<ChatMessage> {
        let system = ChatMessage::system(self.system_prompt());
        let exemplar = ChatMessage::assistant(self.exemplar());
        let user = ChatMessage::user(self.user_prompt(article_text));

        match self {
            PromptTemplate::GenericKeywords => vec![system, user, exemplar],
            PromptTemplate::CompanyTech | PromptTemplate::CompanyTechEvent => {
                vec![system, exemplar, user]
            }
        }
    }
}

impl std::fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
