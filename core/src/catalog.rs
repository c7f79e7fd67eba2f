//! The driver catalog
//!
//! A driver is one lens a program is scored through (Access, Time, ...),
//! broken into sub-drivers. The catalog is static configuration: the
//! standard one is built once per process and shared read-only.

use crate::error::CatalogError;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashSet;

/// One scored aspect of a driver.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SubDriver {
    /// Stable key, used as the key in evaluation output
    pub key: String,
    /// Display name
    pub name: String,
    /// What the sub-driver measures
    pub description: String,
}

impl SubDriver {
    /// Create a sub-driver
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            description: description.into(),
        }
    }
}

/// An evaluation driver with its ordered sub-drivers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    /// Catalog key, e.g. `access`
    pub key: String,
    /// Display name, e.g. "Access"
    pub name: String,
    /// Definition shown to the evaluator
    pub description: String,
    /// Sub-drivers in declaration order
    pub sub_drivers: Vec<SubDriver>,
}

impl Driver {
    /// Create a driver, checking that keys are non-empty and unique.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] for an empty key, no sub-drivers, or a
    /// repeated sub-driver key.
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        sub_drivers: Vec<SubDriver>,
    ) -> Result<Self, CatalogError> {
        let driver = Self {
            key: key.into(),
            name: name.into(),
            description: description.into(),
            sub_drivers,
        };
        driver.check()?;
        Ok(driver)
    }

    fn check(&self) -> Result<(), CatalogError> {
        if self.key.is_empty() {
            return Err(CatalogError::EmptyKey(self.name.clone()));
        }
        if self.sub_drivers.is_empty() {
            return Err(CatalogError::NoSubDrivers(self.key.clone()));
        }
        let mut seen = HashSet::new();
        for sub in &self.sub_drivers {
            if sub.key.is_empty() {
                return Err(CatalogError::EmptyKey(self.key.clone()));
            }
            if !seen.insert(sub.key.as_str()) {
                return Err(CatalogError::DuplicateSubDriver {
                    driver: self.key.clone(),
                    sub_driver: sub.key.clone(),
                });
            }
        }
        Ok(())
    }

    /// Sub-driver keys in declaration order
    pub fn sub_driver_keys(&self) -> impl Iterator<Item = &str> {
        self.sub_drivers.iter().map(|sub| sub.key.as_str())
    }

    /// Look up a sub-driver by key
    #[must_use]
    pub fn sub_driver(&self, key: &str) -> Option<&SubDriver> {
        self.sub_drivers.iter().find(|sub| sub.key == key)
    }
}

/// Ordered, immutable set of drivers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DriverCatalog {
    drivers: Vec<Driver>,
}

impl DriverCatalog {
    /// Build a catalog from drivers, in evaluation order.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if a driver is invalid or two drivers share a key.
    pub fn new(drivers: Vec<Driver>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for driver in &drivers {
            driver.check()?;
            if !seen.insert(driver.key.as_str()) {
                return Err(CatalogError::DuplicateDriver(driver.key.clone()));
            }
        }
        Ok(Self { drivers })
    }

    /// The seven standard drivers, built on first use.
    #[must_use]
    pub fn standard() -> &'static Self {
        &STANDARD
    }

    /// Drivers in catalog order
    pub fn iter(&self) -> std::slice::Iter<'_, Driver> {
        self.drivers.iter()
    }

    /// Number of drivers
    #[must_use]
    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    /// Whether the catalog has no drivers
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    /// Look up a driver by key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Driver> {
        self.drivers.iter().find(|driver| driver.key == key)
    }

    /// Position of a driver in catalog order
    #[must_use]
    pub fn position(&self, key: &str) -> Option<usize> {
        self.drivers.iter().position(|driver| driver.key == key)
    }

    /// Driver keys in catalog order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.drivers.iter().map(|driver| driver.key.as_str())
    }
}

impl<'a> IntoIterator for &'a DriverCatalog {
    type Item = &'a Driver;
    type IntoIter = std::slice::Iter<'a, Driver>;

    fn into_iter(self) -> Self::IntoIter {
        self.drivers.iter()
    }
}

type DriverDef = (
    &'static str,
    &'static str,
    &'static str,
    &'static [(&'static str, &'static str, &'static str)],
);

const STANDARD_DRIVERS: &[DriverDef] = &[
    (
        "access",
        "Access",
        "This category is about providing exclusive or priority access to products, services, events, or experiences not readily available to the general public or non-members.",
        &[
            ("exclusivityOfOfferings", "Exclusivity of Offerings", "Offering members early or exclusive access to new products, services, or events."),
            ("priorityService", "Priority Service", "Providing members with priority service options like expedited shipping or dedicated support."),
            ("vipExperiences", "VIP Experiences", "Granting access to special events and experiences."),
            ("behindTheScenes", "Behind-the-Scenes Access", "Allowing glimpses into exclusive content and insider knowledge."),
            ("membersOnlyContent", "Members-Only Content", "Providing exclusive content, tutorials, webinars, or forums."),
            ("limitedEditionProducts", "Limited Edition Products", "Offering access to purchase limited edition items before the public."),
            ("networkingOpportunities", "Networking Opportunities", "Facilitating exclusive networking events or connections."),
        ],
    ),
    (
        "time",
        "Time",
        "This category focuses on the temporal aspects of loyalty programs, including duration, frequency, and timing of rewards and interactions.",
        &[
            ("programDuration", "Program Duration", "Length of time rewards remain valid and overall program sustainability."),
            ("engagementFrequency", "Engagement Frequency", "How often members need to interact with the program to maintain benefits."),
            ("rewardTiming", "Reward Timing", "Speed and timing of reward delivery and point accumulation."),
            ("seasonalPromotions", "Seasonal Promotions", "Special offers or bonuses during specific times or seasons."),
            ("membershipCycles", "Membership Cycles", "Timing of tier upgrades, renewals, and status maintenance."),
        ],
    ),
    (
        "financial",
        "Financial",
        "This category evaluates the monetary aspects of the loyalty program, including costs, rewards value, and economic sustainability.",
        &[
            ("rewardValue", "Reward Value", "Monetary worth of rewards relative to spending required."),
            ("programCosts", "Program Costs", "Operational and reward fulfillment costs for the business."),
            ("memberSavings", "Member Savings", "Direct financial benefits and discounts for members."),
            ("revenueImpact", "Revenue Impact", "Effect on business revenue and customer lifetime value."),
            ("costEfficiency", "Cost Efficiency", "Balance between program costs and business benefits."),
        ],
    ),
    (
        "security",
        "Security",
        "This category focuses on providing a sense of safety, reliability, and trustworthiness to members of loyalty programs, including data protection, transaction security, and privacy management.",
        &[
            ("dataProtection", "Data Protection and Privacy", "Evaluates how personal information and data are securely stored and protected from unauthorized access or breaches."),
            ("transactionSecurity", "Transaction Security", "Focuses on security measures for financial transactions, including purchases and redemption of rewards."),
            ("securityConsistency", "Consistency in Security Practices", "Assesses how consistently security measures and policies are applied across all program touchpoints."),
            ("incidentResponse", "Response to Security Incidents", "Evaluates program preparedness and responsiveness to potential security incidents and breaches."),
            ("securityTransparency", "Transparency in Security Updates", "Concerns program communication about security updates, improvements, and policy changes."),
            ("privacyManagement", "Ease of Managing Privacy Settings", "Measures the user-friendliness of controlling privacy settings and preferences by members."),
        ],
    ),
    (
        "learning",
        "Learning",
        "This category focuses on providing educational opportunities, resources, and experiences that enhance the knowledge and skills of loyalty program members through workshops, webinars, courses, and informative content.",
        &[
            ("contentRelevance", "Relevance of Content", "Assesses how well educational materials align with members' interests, needs, and professional goals."),
            ("accessibility", "Accessibility of Learning Resources", "Evaluates ease of access to learning materials through various mediums and accommodates different learning styles and abilities."),
            ("contentQuality", "Quality of Educational Content", "Measures the caliber of learning resources, including instructor expertise and teaching effectiveness."),
            ("formatDiversity", "Diversity of Learning Formats", "Focuses on providing varied learning formats like videos, webinars, articles, and podcasts to suit different preferences."),
            ("skillApplication", "Opportunities for Skill Application", "Assesses availability of practical applications through projects, challenges, or real-world scenarios."),
            ("supportSystems", "Feedback and Support Systems", "Evaluates quality of learning support through Q&A sessions, forums, mentorship, and instructor feedback."),
            ("progressTracking", "Progress Tracking and Recognition", "Measures how the program tracks and recognizes member achievements through certificates, badges, or points."),
            ("programClarity", "Clarity of Program Workings", "Assesses how effectively the program communicates its learning components and benefits to members."),
            ("personalization", "Personalization of Learning Pathways", "Evaluates ability to tailor learning experiences to individual member needs, pace, and interests."),
        ],
    ),
    (
        "communications",
        "Communications",
        "This category focuses on maintaining and strengthening relationships through personalized messaging, timely updates, and open channels for feedback and dialogue to ensure members feel heard, valued, and connected.",
        &[
            ("messageClarity", "Clarity of Messages", "Evaluates how clearly and understandably program communications are presented to members."),
            ("informationRelevance", "Relevance of Information", "Assesses how well communications are tailored to individual member interests, needs, and preferences."),
            ("communicationFrequency", "Frequency of Communication", "Measures the balance of communication frequency to keep members informed without overwhelming them."),
            ("multichannel", "Multichannel Communication with Preference Adaptation", "Assesses program's ability to use various channels while adapting to member preferences."),
            ("feedbackMechanisms", "Feedback Mechanisms", "Evaluates availability and effectiveness of channels for member feedback and questions."),
            ("responseTimeliness", "Timeliness of Responses", "Assesses how quickly the program responds to member inquiries, feedback, or issues."),
            ("channelConsistency", "Consistency Across Channels", "Measures consistency of messaging and information across different communication channels."),
            ("engagementOpportunities", "Engagement Opportunities", "Focuses on creating meaningful ways for members to engage through interactive content and forums."),
            ("optionManagement", "Ease of Opt-Out or Opt-In Options", "Evaluates how easily members can manage their communication preferences."),
        ],
    ),
    (
        "knowMe",
        "Know Me",
        "This category emphasizes personalization and understanding the unique preferences, behaviors, and needs of each loyalty program member through data analytics and insights.",
        &[
            ("personalizedOffers", "Personalization of Offers and Rewards", "Evaluates how well offers and rewards are tailored to match individual member interests and behavior."),
            ("milestoneRecognition", "Recognition of Member Milestones", "Focuses on acknowledging key milestones in a member's journey with personalized messages or offers."),
            ("feedbackAdaptation", "Adaptation to Member Feedback", "Measures program's responsiveness to individual member feedback and suggestions."),
            ("predictivePersonalization", "Predictive Personalization", "Evaluates use of data analytics to anticipate member needs and preferences."),
            ("touchpointConsistency", "Consistency Across Touchpoints", "Assesses consistency of personalized experiences across all program interactions."),
            ("dynamicPersonalization", "Dynamic Personalization", "Measures ability to update personalization based on evolving member behavior."),
            ("contextualPersonalization", "Contextual Personalization", "Focuses on tailoring experiences based on current context and situation of the member."),
            ("inclusivePersonalization", "Inclusive Personalization", "Assesses success in creating inclusive personalization strategies for diverse member backgrounds."),
        ],
    ),
];

// Built without checks; `test_standard_catalog_is_valid` covers the data.
static STANDARD: Lazy<DriverCatalog> = Lazy::new(|| DriverCatalog {
    drivers: STANDARD_DRIVERS
        .iter()
        .map(|&(key, name, description, subs)| Driver {
            key: key.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            sub_drivers: subs
                .iter()
                .map(|&(key, name, description)| SubDriver::new(key, name, description))
                .collect(),
        })
        .collect(),
});
