//! Provider profile attributes and merge outcomes.

// self
use crate::{_prelude::*, auth::Principal};

/// Identity attributes asserted by the provider.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedProfile {
	/// Provider subject identifier.
	pub federated_id: String,
	/// Email address; required for merging.
	pub email: Option<String>,
	/// Given name.
	pub given_name: Option<String>,
	/// Family name.
	pub family_name: Option<String>,
	/// Avatar URL.
	pub avatar_url: Option<String>,
	/// Full display name.
	pub display_name: Option<String>,
}

/// Principal resolved from a federated profile.
#[derive(Clone, Debug)]
pub struct MergeOutcome {
	/// Existing or newly created principal.
	pub principal: Principal,
	/// Whether the principal was created by the merge.
	pub created: bool,
}
