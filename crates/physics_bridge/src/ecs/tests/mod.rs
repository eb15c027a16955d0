//! ECS-level integration tests
