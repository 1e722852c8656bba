#![allow(dead_code)]

use proptest::prelude::*;
use promotion_core::state_machine::PromotionType;

/// How a generated record should be set up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordPlan {
    Promote,
    PromoteIntoFullClass,
    PromoteWithoutTarget,
    Retain,
    Graduate,
    GraduateTooEarly,
}

impl RecordPlan {
    pub fn promotion_type(self) -> PromotionType {
        match self {
            Self::Promote | Self::PromoteIntoFullClass | Self::PromoteWithoutTarget => {
                PromotionType::Promoted
            }
            Self::Retain => PromotionType::Retained,
            Self::Graduate | Self::GraduateTooEarly => PromotionType::Graduated,
        }
    }

    pub fn should_succeed(self) -> bool {
        matches!(self, Self::Promote | Self::Retain | Self::Graduate)
    }
}

pub fn record_plan_strategy() -> impl Strategy<Value = RecordPlan> {
    prop_oneof![
        3 => Just(RecordPlan::Promote),
        1 => Just(RecordPlan::PromoteIntoFullClass),
        1 => Just(RecordPlan::PromoteWithoutTarget),
        2 => Just(RecordPlan::Retain),
        2 => Just(RecordPlan::Graduate),
        1 => Just(RecordPlan::GraduateTooEarly),
    ]
}

pub fn batch_plan_strategy() -> impl Strategy<Value = Vec<RecordPlan>> {
    prop::collection::vec(record_plan_strategy(), 0..40)
}
