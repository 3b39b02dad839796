// Copyright (c) supalite.dev 2025
// This file is licensed under the MIT

mod client;

pub(crate) use client::RestClient;
