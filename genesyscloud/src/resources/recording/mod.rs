pub mod resource_recording_settings;
