pub mod resource_presence_definition;
