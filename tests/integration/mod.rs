// Integration Tests - Require Docker
// These tests start a PostgreSQL container and may be slow
