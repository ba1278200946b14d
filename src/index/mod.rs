pub mod autocomplete;
pub mod locale;
pub mod tags;

pub use autocomplete::{AutocompleteIndex, AutocompleteIndexer};
pub use locale::{canonical_locale, ROOT_LOCALE};
pub use tags::{server_tags, LocaleIndexer, TagIndexer, TagSnapshot};
