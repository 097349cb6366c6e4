/// Shared domain types used across the codebase

use serde::{Deserialize, Serialize};

/// Fixed, ordered stages a prospective client moves through.
/// Stored in the database as snake_case text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Leads,
    Consulting,
    AppointmentsMade,
    Inking,
    FollowUps,
    Completed,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 6] = [
        PipelineStage::Leads,
        PipelineStage::Consulting,
        PipelineStage::AppointmentsMade,
        PipelineStage::Inking,
        PipelineStage::FollowUps,
        PipelineStage::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Leads => "leads",
            PipelineStage::Consulting => "consulting",
            PipelineStage::AppointmentsMade => "appointments_made",
            PipelineStage::Inking => "inking",
            PipelineStage::FollowUps => "follow_ups",
            PipelineStage::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "leads" => Some(PipelineStage::Leads),
            "consulting" => Some(PipelineStage::Consulting),
            "appointments_made" => Some(PipelineStage::AppointmentsMade),
            "inking" => Some(PipelineStage::Inking),
            "follow_ups" => Some(PipelineStage::FollowUps),
            "completed" => Some(PipelineStage::Completed),
            _ => None,
        }
    }
}

/// Subscription tiers a shop can be on. The billing provider owns the ledger;
/// these mirror the plan metadata it sends in webhook payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    Free,
    Studio,
    Pro,
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Studio => "studio",
            SubscriptionTier::Pro => "pro",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "free" => Some(SubscriptionTier::Free),
            "studio" => Some(SubscriptionTier::Studio),
            "pro" => Some(SubscriptionTier::Pro),
            _ => None,
        }
    }
}

/// Subscription status as reconciled from billing webhook events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    PastDue,
    Canceled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(SubscriptionStatus::Active),
            "past_due" => Some(SubscriptionStatus::PastDue),
            "canceled" => Some(SubscriptionStatus::Canceled),
            _ => None,
        }
    }
}

/// Role a user holds within a shop membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Owner,
    Manager,
    Staff,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Owner => "owner",
            MemberRole::Manager => "manager",
            MemberRole::Staff => "staff",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(MemberRole::Owner),
            "manager" => Some(MemberRole::Manager),
            "staff" => Some(MemberRole::Staff),
            _ => None,
        }
    }

    /// Whether this role may manage members and shop settings.
    pub fn can_manage(&self) -> bool {
        matches!(self, MemberRole::Owner | MemberRole::Manager)
    }
}

/// Lifecycle of an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Canceled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Canceled => "canceled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(AppointmentStatus::Scheduled),
            "completed" => Some(AppointmentStatus::Completed),
            "canceled" => Some(AppointmentStatus::Canceled),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_round_trips_through_text() {
        for stage in PipelineStage::ALL {
            assert_eq!(PipelineStage::parse(stage.as_str()), Some(stage));
        }
        assert_eq!(PipelineStage::parse("onboarding"), None);
    }

    #[test]
    fn stages_are_ordered() {
        assert!(PipelineStage::Leads < PipelineStage::Consulting);
        assert!(PipelineStage::Inking < PipelineStage::Completed);
    }

    #[test]
    fn manager_roles_can_manage() {
        assert!(MemberRole::Owner.can_manage());
        assert!(MemberRole::Manager.can_manage());
        assert!(!MemberRole::Staff.can_manage());
    }
}
