//! Writes the "Welcome" blurb shown at the top of shared analyses from an
//! agent's profile.

use propcast_common::models::{AgentProfile, User};
use serde_json::json;
use tracing::{error, info};

use crate::client::CompletionClient;
use crate::models::{ChatMessage, DEFAULT_MODEL};

pub const SYSTEM_PROMPT: &str = "You are a professional real estate marketing expert. \
Generate compelling, personalized agent descriptions that highlight the agent's unique \
value proposition and experience.";

const EXAMPLE: &str = "\"Hi, I'm Austin Southern, Team Lead and Executive Vice President at \
Monumental, powered by PLACE.\nAs your professional real estate advisor, my mission is simple: \
exceed expectations and ensure complete satisfaction. With years of industry experience, I'm \
equipped to guide you through every step of your home sale, from preparation and pricing to \
negotiation and closing.\"";

const REQUIREMENTS: &[&str] = &[
    "Start with a warm, welcoming greeting using the agent's name",
    "Include their role/position and company name",
    "Highlight their experience and expertise in a positive way",
    "Mention their mission or value proposition",
    "Keep it professional yet warm and approachable",
    "Make it sound authentic and personalized",
    "Keep the total length to 1-2 paragraphs maximum (100-150 words)",
    "Focus on what makes them unique and trustworthy",
    "End with a commitment to client satisfaction",
    "Use welcoming, positive language throughout",
    "Make it feel like a personal introduction, not a sales pitch",
    "Be concise and impactful - every word should matter",
];

#[derive(Clone)]
pub struct AgentDescriptionGenerator {
    client: CompletionClient,
}

impl AgentDescriptionGenerator {
    pub fn new(client: CompletionClient) -> Self {
        Self { client }
    }

    pub fn build_prompt(user: &User, profile: &AgentProfile) -> String {
        let specialty = match profile.specialty_display() {
            "" => profile.specialty.as_str(),
            label => label,
        };
        let selling_style = match profile.selling_style_display() {
            "" => profile.selling_style.as_str(),
            label => label,
        };

        let mut prompt = String::new();
        prompt.push_str(
            "Create a concise, professional agent description for a real estate agent.\n\
             This will appear at the top of a property analysis as a \"Welcome\" section.\n\n\
             The description should be similar in style to this example:\n\n",
        );
        prompt.push_str(EXAMPLE);
        prompt.push_str("\n\nUse the following agent information to create a personalized description:\n\n");
        prompt.push_str(&format!(
            "Agent Name: {} {}\n\
             Company: {}\n\
             Years of Experience: {}\n\
             Specialty: {}\n\
             Awards/Certifications: {}\n\
             Mission: {}\n\
             Value Proposition: {}\n\
             Selling Style: {}\n\
             Performance Highlights:\n\
             - Shortest Sale: {}\n\
             - Highest Sale: {}\n\
             - Average Days on Market: {}\n\n\
             Client Testimonials:\n\
             - {}\n\
             - {}\n\
             - {}\n\n\
             Community Involvement: {}\n\n",
            user.first_name,
            user.last_name,
            profile.company_name,
            profile.experience_display(),
            specialty,
            profile.awards,
            profile.mission,
            profile.value_proposition,
            selling_style,
            profile.shortest_sale,
            profile.highest_sale,
            profile.avg_days_on_market,
            profile.testimonial_1,
            profile.testimonial_2,
            profile.testimonial_3,
            profile.community_ties,
        ));
        prompt.push_str("Requirements:\n");
        for (i, line) in REQUIREMENTS.iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", i + 1, line));
        }
        prompt.push_str(
            "\nGenerate a compelling, welcoming description that makes potential clients \
             feel confident and comfortable working with this agent.",
        );
        prompt
    }

    /// `None` on any provider failure or an empty answer; failures are logged.
    pub async fn generate(&self, user: &User, profile: &AgentProfile) -> Option<String> {
        let messages = json!([
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(&Self::build_prompt(user, profile)),
        ]);

        let response = match self.client.chat(Some(DEFAULT_MODEL), &messages).await {
            Ok(r) => r,
            Err(e) => {
                error!("agent description generation failed for {}: {}", user.user_id, e);
                return None;
            }
        };

        match CompletionClient::first_choice(&response) {
            Some(text) => {
                info!("generated agent description for {} ({} chars)", user.user_id, text.len());
                Some(text)
            }
            None => {
                error!("agent description response had no content for {}", user.user_id);
                None
            }
        }
    }
}
