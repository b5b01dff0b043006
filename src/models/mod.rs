// Data models for the CRM API

pub mod lead;
