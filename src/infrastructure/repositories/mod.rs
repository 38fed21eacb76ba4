// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod project_repo_impl;
pub mod resource_repo_impl;

pub use project_repo_impl::ProjectRepositoryImpl;
pub use resource_repo_impl::ResourceRepositoryImpl;
