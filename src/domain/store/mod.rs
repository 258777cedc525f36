pub mod consistent_map;
