/*
 * Responsibility
 * - the request pipeline, outermost first:
 *   http (request id, trace) -> audit -> timeout -> auth -> basic_auth -> proxy
 */
pub mod audit;
pub mod auth;
pub mod basic_auth;
pub mod http;
