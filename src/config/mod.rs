pub mod onboarding;

pub use onboarding::{OnboardingConfig, Question};
