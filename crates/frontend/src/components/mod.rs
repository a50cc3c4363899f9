pub mod country_lookup;
pub mod directory_map;
pub mod entity_list;
pub mod entity_popup;
pub mod search_bar;
