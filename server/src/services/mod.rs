pub mod topology_source;
