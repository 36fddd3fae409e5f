use serde::{Deserialize, Serialize};
use smol_str::format_smolstr;

use crate::errors::{Entity, Error};

/// Grouping id is a 64-bit mask, one bit per distinct grouping expression.
pub const DEFAULT_MAX_GROUPING_SET_ITEMS: usize = 64;

/// Planner options.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default)]
pub struct Options {
    /// Maximum number of distinct expressions over all grouping sets
    /// of a single repeat node. Can be lowered, but not raised above
    /// [`DEFAULT_MAX_GROUPING_SET_ITEMS`].
    pub max_grouping_set_items: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            max_grouping_set_items: DEFAULT_MAX_GROUPING_SET_ITEMS,
        }
    }
}

impl Options {
    /// # Errors
    /// - `max_grouping_set_items` is zero or does not fit the grouping id
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_grouping_set_items == 0
            || self.max_grouping_set_items > DEFAULT_MAX_GROUPING_SET_ITEMS
        {
            return Err(Error::Invalid(
                Entity::Option,
                Some(format_smolstr!(
                    "max_grouping_set_items must be in range 1..={DEFAULT_MAX_GROUPING_SET_ITEMS}, got {}",
                    self.max_grouping_set_items
                )),
            ));
        }
        Ok(())
    }
}

/// Like [`Options`], but with some values unspecified.
#[derive(Default, Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct PartialOptions {
    pub max_grouping_set_items: Option<usize>,
}

impl PartialOptions {
    /// Creates a full [`Options`] value.
    ///
    /// If a value is specified in `self`, then it will be used.
    /// Otherwise, the corresponding value from `defaults` will be used.
    #[must_use]
    pub fn unwrap_or(&self, defaults: Options) -> Options {
        Options {
            max_grouping_set_items: self
                .max_grouping_set_items
                .unwrap_or(defaults.max_grouping_set_items),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn yaml_defaults() {
        let options: Options = serde_yaml::from_str("{}").unwrap();
        assert_eq!(options, Options::default());
        assert_eq!(options.max_grouping_set_items, 64);

        let options: Options = serde_yaml::from_str("max_grouping_set_items: 8").unwrap();
        assert_eq!(options.max_grouping_set_items, 8);
        options.validate().unwrap();
    }

    #[test]
    fn partial_options_fall_back_to_defaults() {
        let partial: PartialOptions = serde_yaml::from_str("{}").unwrap();
        assert_eq!(partial.unwrap_or(Options::default()), Options::default());

        let partial = PartialOptions {
            max_grouping_set_items: Some(3),
        };
        assert_eq!(partial.unwrap_or(Options::default()).max_grouping_set_items, 3);
    }

    #[test]
    fn validate_bounds() {
        for limit in [0, 65] {
            let err = Options {
                max_grouping_set_items: limit,
            }
            .validate()
            .unwrap_err();
            assert_eq!(
                err.to_string(),
                format!("invalid option: max_grouping_set_items must be in range 1..=64, got {limit}")
            );
        }
    }
}
