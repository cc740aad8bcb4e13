use netcap_models::{ServiceSpec, Target};

use crate::errors::{EngineError, EngineResult};

/// Builds the ordered target set `prefix-000 .. prefix-<count-1>`.
///
/// Count is signed so that negative input from the command line reaches
/// this check instead of being rejected as a parse error.
pub fn generate_targets(
    prefix: &str,
    count: i64,
    template: &ServiceSpec,
) -> EngineResult<Vec<Target>> {
    if prefix.is_empty() {
        return Err(EngineError::InvalidArgument(
            "prefix must not be empty".into(),
        ));
    }
    let count = u32::try_from(count).map_err(|_| {
        EngineError::InvalidArgument(format!(
            "count must be between 0 and {}, got {}",
            u32::MAX,
            count
        ))
    })?;
    Ok((0..count)
        .map(|ordinal| Target::new(prefix, ordinal, template))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use netcap_models::SERVICE_NAME_ENV;
    use std::collections::HashSet;

    fn template() -> ServiceSpec {
        ServiceSpec::internal_probe_service("img", "net", "sub", "http://t")
    }

    #[test]
    fn ids_are_distinct_and_padded() {
        for n in [0i64, 1, 7, 120] {
            let targets = generate_targets("svc", n, &template()).unwrap();
            assert_eq!(targets.len(), n as usize);
            let ids: HashSet<_> = targets.iter().map(|t| t.id.clone()).collect();
            assert_eq!(ids.len(), n as usize);
            for t in &targets {
                let digits = t.id.strip_prefix("svc-").unwrap();
                assert_eq!(digits.len(), 3);
                assert_eq!(digits.parse::<u32>().unwrap(), t.ordinal);
            }
        }
    }

    #[test]
    fn same_inputs_same_ids() {
        let a = generate_targets("run", 5, &template()).unwrap();
        let b = generate_targets("run", 5, &template()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn each_target_carries_its_own_name() {
        let targets = generate_targets("svc", 3, &template()).unwrap();
        let env = targets[2].spec.template.containers[0].env_value(SERVICE_NAME_ENV);
        assert_eq!(env, Some("svc-002"));
    }

    #[test]
    fn rejects_negative_count_and_empty_prefix() {
        assert!(matches!(
            generate_targets("svc", -1, &template()),
            Err(EngineError::InvalidArgument(_))
        ));
        assert!(matches!(
            generate_targets("", 3, &template()),
            Err(EngineError::InvalidArgument(_))
        ));
    }
}
