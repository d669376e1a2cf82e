//! Inference stage.
//!
//! One stage type covers both service variants:
//!
//! - `Simple`: a single approve/deny classifier
//! - `MultiStage`: credit score (regression), then approval (classification),
//!   then, only for approved applicants, approved amount (log-space regression,
//!   inverted with `expm1`) and interest rate (regression)
//!
//! The amount and rate models were fit on approved applicants only, so they are
//! never invoked for a denied applicant.

use nalgebra::DVector;

use crate::domain::ServiceVariant;
use crate::error::PredictError;
use crate::models::estimator::Estimator;

/// Raw (unrounded) stage output.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutput {
    Decision {
        approved: bool,
        probability: f64,
    },
    Eligibility {
        credit_score: f64,
        probability: f64,
        approved: bool,
        approved_amount: f64,
        interest_rate: Option<f64>,
    },
}

#[derive(Debug)]
pub enum InferenceStage {
    Simple {
        approval: Box<dyn Estimator>,
    },
    MultiStage {
        credit_score: Box<dyn Estimator>,
        approval: Box<dyn Estimator>,
        approved_amount: Box<dyn Estimator>,
        interest_rate: Box<dyn Estimator>,
    },
}

impl InferenceStage {
    pub fn variant(&self) -> ServiceVariant {
        match self {
            InferenceStage::Simple { .. } => ServiceVariant::Simple,
            InferenceStage::MultiStage { .. } => ServiceVariant::MultiStage,
        }
    }

    /// Run the stage on a scaled feature vector.
    pub fn run(&self, x: &DVector<f64>) -> Result<StageOutput, PredictError> {
        match self {
            InferenceStage::Simple { approval } => {
                let (approved, probability) = classify(approval.as_ref(), x)?;
                Ok(StageOutput::Decision {
                    approved,
                    probability,
                })
            }
            InferenceStage::MultiStage {
                credit_score,
                approval,
                approved_amount,
                interest_rate,
            } => {
                let score = finite("credit_score", credit_score.predict(x)?)?;
                let (approved, probability) = classify(approval.as_ref(), x)?;

                let (amount, rate) = if approved {
                    let log_amount = finite("approved_amount", approved_amount.predict(x)?)?;
                    let amount = finite("approved_amount", invert_log_amount(log_amount))?;
                    let rate = finite("interest_rate", interest_rate.predict(x)?)?;
                    (amount, Some(rate))
                } else {
                    (0.0, None)
                };

                Ok(StageOutput::Eligibility {
                    credit_score: score,
                    probability,
                    approved,
                    approved_amount: amount,
                    interest_rate: rate,
                })
            }
        }
    }
}

fn classify(model: &dyn Estimator, x: &DVector<f64>) -> Result<(bool, f64), PredictError> {
    let probability = finite("approval_probability", model.predict_proba(x)?)?.clamp(0.0, 1.0);
    let label = finite("approval", model.predict(x)?)?;
    Ok((label != 0.0, probability))
}

fn finite(output: &str, value: f64) -> Result<f64, PredictError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PredictError::Inference(format!(
            "model produced a non-finite {output}: {value}"
        )))
    }
}

/// Undo the `log1p` target transform; negative amounts floor at zero.
pub fn invert_log_amount(log_amount: f64) -> f64 {
    log_amount.exp_m1().max(0.0)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Returns fixed outputs and counts how often it is called.
    #[derive(Debug)]
    struct Fixed {
        value: f64,
        proba: Option<f64>,
        calls: Arc<AtomicUsize>,
    }

    impl Fixed {
        fn boxed(value: f64, proba: Option<f64>) -> (Box<dyn Estimator>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let model = Fixed {
                value,
                proba,
                calls: Arc::clone(&calls),
            };
            (Box::new(model), calls)
        }
    }

    impl Estimator for Fixed {
        fn predict(&self, _x: &DVector<f64>) -> Result<f64, PredictError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.value)
        }

        fn predict_proba(&self, _x: &DVector<f64>) -> Result<f64, PredictError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.proba
                .ok_or_else(|| PredictError::Inference("not a classifier".to_string()))
        }
    }

    fn multi(approval_label: f64, log_amount: f64) -> (InferenceStage, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let (credit_score, _) = Fixed::boxed(712.345, None);
        let (approval, _) = Fixed::boxed(approval_label, Some(if approval_label > 0.0 { 0.8 } else { 0.3 }));
        let (approved_amount, amount_calls) = Fixed::boxed(log_amount, None);
        let (interest_rate, rate_calls) = Fixed::boxed(8.456, None);
        let stage = InferenceStage::MultiStage {
            credit_score,
            approval,
            approved_amount,
            interest_rate,
        };
        (stage, amount_calls, rate_calls)
    }

    #[test]
    fn denied_applicant_skips_amount_and_rate_models() {
        let (stage, amount_calls, rate_calls) = multi(0.0, 10.0);
        let out = stage.run(&DVector::zeros(3)).unwrap();
        assert_eq!(
            out,
            StageOutput::Eligibility {
                credit_score: 712.345,
                probability: 0.3,
                approved: false,
                approved_amount: 0.0,
                interest_rate: None,
            }
        );
        assert_eq!(amount_calls.load(Ordering::SeqCst), 0);
        assert_eq!(rate_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn approved_applicant_gets_amount_in_original_units() {
        let (stage, amount_calls, rate_calls) = multi(1.0, 25_000f64.ln_1p());
        let StageOutput::Eligibility {
            approved_amount,
            interest_rate,
            approved,
            ..
        } = stage.run(&DVector::zeros(3)).unwrap()
        else {
            panic!("expected eligibility output");
        };
        assert!(approved);
        assert!((approved_amount - 25_000.0).abs() < 1e-6);
        assert_eq!(interest_rate, Some(8.456));
        assert_eq!(amount_calls.load(Ordering::SeqCst), 1);
        assert_eq!(rate_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn log_amount_round_trip() {
        for &amount in &[0.0, 0.01, 1.0, 499.99, 15_000.0, 250_000.0, 1e7] {
            let back = invert_log_amount(f64::ln_1p(amount));
            assert!(
                (back - amount).abs() <= 1e-9 * amount.max(1.0),
                "{amount} -> {back}"
            );
        }
        assert_eq!(invert_log_amount(-0.5), 0.0);
    }

    #[test]
    fn simple_stage_reports_label_and_probability() {
        let (approval, _) = Fixed::boxed(1.0, Some(0.97));
        let stage = InferenceStage::Simple { approval };
        assert_eq!(stage.variant(), ServiceVariant::Simple);
        assert_eq!(
            stage.run(&DVector::zeros(2)).unwrap(),
            StageOutput::Decision {
                approved: true,
                probability: 0.97,
            }
        );
    }

    #[test]
    fn non_finite_outputs_are_inference_errors() {
        let (credit_score, _) = Fixed::boxed(f64::NAN, None);
        let (approval, _) = Fixed::boxed(1.0, Some(0.5));
        let (approved_amount, _) = Fixed::boxed(1.0, None);
        let (interest_rate, _) = Fixed::boxed(1.0, None);
        let stage = InferenceStage::MultiStage {
            credit_score,
            approval,
            approved_amount,
            interest_rate,
        };
        let err = stage.run(&DVector::zeros(1)).unwrap_err();
        assert!(matches!(err, PredictError::Inference(ref m) if m.contains("credit_score")));
    }

    #[test]
    fn amount_overflowing_after_expm1_is_an_inference_error() {
        let (stage, _, rate_calls) = multi(1.0, 800.0);
        let err = stage.run(&DVector::zeros(3)).unwrap_err();
        assert!(matches!(err, PredictError::Inference(ref m) if m.contains("approved_amount")));
        assert_eq!(rate_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn out_of_range_probability_is_clamped() {
        let (approval, _) = Fixed::boxed(1.0, Some(1.0000001));
        let stage = InferenceStage::Simple { approval };
        let StageOutput::Decision { probability, .. } = stage.run(&DVector::zeros(1)).unwrap() else {
            panic!("expected decision output");
        };
        assert_eq!(probability, 1.0);
    }
}
