//! The reference registry: three families backed by the bundled engines.

use crate::domain::{Constraint, Mode, PredictionType};
use crate::engines::kknn::KERNELS;
use crate::engines::{ElasticNet, LinearModel, LogisticModel, NearestNeighbors};
use crate::error::SpecError;

use super::{DataSlot, EngineDef, FamilyDef, Interface, MainArg, Registry};

impl Registry {
    /// `linear_reg`, `logistic_reg` and `nearest_neighbor` with their engines.
    pub fn standard() -> Result<Registry, SpecError> {
        let mut reg = Registry::new();

        reg.register_family(
            FamilyDef::new("linear_reg", "Linear Regression")
                .arg(MainArg::new("penalty", Constraint::NonNegative).with_default(0.0))
                .arg(MainArg::new("mixture", Constraint::UnitInterval).with_default(1.0))
                .modes(&[Mode::Regression]),
        )?;
        reg.register_engine(
            "linear_reg",
            EngineDef::new("lm", LinearModel)
                .modes(&[Mode::Regression])
                .predicts(Mode::Regression, PredictionType::Point)
                .predicts(Mode::Regression, PredictionType::Interval),
        )?;
        reg.register_engine(
            "linear_reg",
            EngineDef::new("glmnet", ElasticNet)
                .modes(&[Mode::Regression])
                .interface(Interface::Matrix)
                .map_arg("penalty", "lambda")
                .map_arg("mixture", "alpha")
                .extra_arg("standardize")
                .extra_arg("maxit")
                .extra_arg("thresh")
                .predicts(Mode::Regression, PredictionType::Point),
        )?;

        reg.register_family(
            FamilyDef::new("logistic_reg", "Logistic Regression")
                .arg(MainArg::new("penalty", Constraint::NonNegative).with_default(0.0))
                .arg(MainArg::new("mixture", Constraint::UnitInterval).with_default(1.0))
                .modes(&[Mode::Classification]),
        )?;
        reg.register_engine(
            "logistic_reg",
            EngineDef::new("glm", LogisticModel)
                .modes(&[Mode::Classification])
                .extra_arg("maxit")
                .predicts(Mode::Classification, PredictionType::Point)
                .predicts(Mode::Classification, PredictionType::Probability),
        )?;

        reg.register_family(
            FamilyDef::new("nearest_neighbor", "K-Nearest Neighbor")
                .arg(MainArg::new("neighbors", Constraint::PositiveInt).with_default(5i64))
                .arg(
                    MainArg::new(
                        "weight_func",
                        Constraint::OneOf(KERNELS.iter().map(|k| k.to_string()).collect()),
                    )
                    .with_default("rectangular"),
                )
                .modes(&[Mode::Regression, Mode::Classification]),
        )?;
        reg.register_engine(
            "nearest_neighbor",
            EngineDef::new("kknn", NearestNeighbors)
                .modes(&[Mode::Regression, Mode::Classification])
                .interface(Interface::Matrix)
                .data_arg(DataSlot::X, "train")
                .data_arg(DataSlot::Y, "y")
                .map_arg("neighbors", "k")
                .map_arg("weight_func", "kernel")
                .predicts(Mode::Regression, PredictionType::Point)
                .predicts(Mode::Classification, PredictionType::Point)
                .predicts(Mode::Classification, PredictionType::Probability),
        )?;

        Ok(reg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ArgValue;

    #[test]
    fn standard_registry_lists_every_engine_mode_pair() {
        let reg = Registry::standard().unwrap();
        let ids: Vec<&str> = reg.families().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["linear_reg", "logistic_reg", "nearest_neighbor"]);
        assert_eq!(
            reg.show_engines("nearest_neighbor").unwrap(),
            vec![
                ("kknn".to_string(), Mode::Regression),
                ("kknn".to_string(), Mode::Classification)
            ]
        );
    }

    #[test]
    fn glmnet_translates_penalty_and_mixture() {
        let reg = Registry::standard().unwrap();
        let spec = reg.create_specification("linear_reg", Mode::Unspecified).unwrap();
        assert_eq!(spec.mode(), Mode::Regression);
        let spec = reg.with_engine(&spec, "glmnet").unwrap();
        let spec = reg.with_argument(&spec, "mixture", 0.5).unwrap();
        let spec = reg.with_argument(&spec, "penalty", 0.1).unwrap();
        assert_eq!(
            reg.translate(&spec).unwrap(),
            vec![
                ("lambda".to_string(), ArgValue::Float(0.1)),
                ("alpha".to_string(), ArgValue::Float(0.5)),
            ]
        );
    }

    #[test]
    fn penalty_on_glm_is_unsupported() {
        let reg = Registry::standard().unwrap();
        let spec = reg.create_specification("logistic_reg", Mode::Classification).unwrap();
        let spec = reg.with_engine(&spec, "glm").unwrap();
        let spec = reg.with_argument(&spec, "penalty", 1.0).unwrap();
        assert!(matches!(
            reg.translate(&spec),
            Err(SpecError::UnsupportedArgument { .. })
        ));
    }

    #[test]
    fn prediction_support_matches_engine_capabilities() {
        let reg = Registry::standard().unwrap();
        let lm = reg.engine("linear_reg", "lm").unwrap();
        assert!(lm.supports_prediction(Mode::Regression, PredictionType::Interval));
        assert!(!lm.supports_prediction(Mode::Regression, PredictionType::Probability));
        let kknn = reg.engine("nearest_neighbor", "kknn").unwrap();
        assert!(kknn.supports_prediction(Mode::Classification, PredictionType::Probability));
        assert!(!kknn.supports_prediction(Mode::Regression, PredictionType::Probability));
    }

    #[test]
    fn weight_func_is_validated_against_known_kernels() {
        let reg = Registry::standard().unwrap();
        let spec = reg.create_specification("nearest_neighbor", Mode::Regression).unwrap();
        assert!(reg.with_argument(&spec, "weight_func", "triangular").is_ok());
        assert!(matches!(
            reg.with_argument(&spec, "weight_func", "epanechnikov"),
            Err(SpecError::InvalidArgumentValue { .. })
        ));
        assert!(matches!(
            reg.with_argument(&spec, "neighbors", 0i64),
            Err(SpecError::InvalidArgumentValue { .. })
        ));
    }
}
