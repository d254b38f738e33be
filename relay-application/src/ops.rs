pub mod group_hub;
