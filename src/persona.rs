//! Customer profiles for the sales role-play
//!
//! Each profile maps to an ordered list of system turns installed once at the
//! start of a conversation. The preamble tells the chat backend to play a
//! prospective insurance customer and to give feedback when the call ends.

use serde::Deserialize;

use crate::conversation::ConversationTurn;

/// Coach role line, always first
const COACH_ROLE: &str = "You are an expert coach specialized in insurance.";

/// Common simulation precondition shared by every profile
const SIMULATION_PRECONDITION: &str = "You are an expert insurance salesman trainer. \
Your role is to simulate a potential customer and provide feedback on the salesperson's \
performance. When you hear the word 'start' you will begin the simulation, and when you hear \
'stop' you will end the conversation.";

/// Closing instruction, always last
const FEEDBACK_INSTRUCTION: &str = "At the end of the conversation, please provide feedback on \
the salesperson's performance during the interaction, analyze their responses, and suggest \
improvements or alternative approaches that could have been taken. Additionally, evaluate the \
friendliness, security, and professionalism of the salesperson.";

const FAMILY_CUSTOMER: &str = "The customer to simulate is a 35-year-old IT professional with \
some insights into finance, a child, and a spouse. They have stable jobs, the husband is well \
paid around 130.000 CHF a year, and the spouse 85000 CHF. They have a small amount of savings in \
several 3a pillar pension funds. They are concerned about achieving financial security for their \
family in the event of an accident, illness, or anything unexpected. The insurance salesperson \
will approach you to understand your financial position and needs. They will aim to be friendly \
and professional, transmit safety and a relaxed attitude, and discuss possible insurance options. \
They will help you understand these options using simple terminology and convince you to take \
further steps.";

const FAMILY_OPENING: &str = "Upon start you will play only the role of the potential customer \
with name 'Mr. Wiggins' and then wait for the response of the human counterpart. You will start \
all the prompts with 'Mr.Wiggins:' And the first prompt after the 'start' will be to begin the \
call with the prompt 'Hi, I am Mr. Wiggins and I might be interested in a possible insurance.' \
Then wait for the reply of the human counterpart which plays the role as the Salesperson.";

/// Simulated customer profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CustomerProfile {
    /// Early-career professional
    YoungProfessional,
    /// Married, no children
    FatherWithSpouse,
    /// Married with children (Mr. Wiggins)
    #[default]
    FatherWithSpouseAndChildren,
    /// Self-employed business owner
    SelfEmployed,
    /// Approaching retirement
    PreRetiree,
}

impl CustomerProfile {
    /// Every profile, in declaration order
    pub const ALL: [Self; 5] = [
        Self::YoungProfessional,
        Self::FatherWithSpouse,
        Self::FatherWithSpouseAndChildren,
        Self::SelfEmployed,
        Self::PreRetiree,
    ];

    /// Kebab-case identifier
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::YoungProfessional => "young-professional",
            Self::FatherWithSpouse => "father-with-spouse",
            Self::FatherWithSpouseAndChildren => "father-with-spouse-and-children",
            Self::SelfEmployed => "self-employed",
            Self::PreRetiree => "pre-retiree",
        }
    }

    /// Profile-specific system instructions
    const fn instructions(self) -> &'static [&'static str] {
        match self {
            Self::FatherWithSpouseAndChildren => &[FAMILY_CUSTOMER, FAMILY_OPENING],
            Self::YoungProfessional
            | Self::FatherWithSpouse
            | Self::SelfEmployed
            | Self::PreRetiree => &[],
        }
    }

    /// Ordered system turns to install at session start
    #[must_use]
    pub fn preamble(self) -> Vec<ConversationTurn> {
        [COACH_ROLE, SIMULATION_PRECONDITION]
            .into_iter()
            .chain(self.instructions().iter().copied())
            .chain(std::iter::once(FEEDBACK_INSTRUCTION))
            .map(ConversationTurn::system)
            .collect()
    }
}

impl std::fmt::Display for CustomerProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl std::str::FromStr for CustomerProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|p| p.id() == wanted)
            .ok_or_else(|| format!("unknown customer profile: {s}"))
    }
}
