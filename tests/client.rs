// Integration tests for `DirectoryClient` against a mock directory service.
// The blocking client is driven from the test thread while a manually built
// tokio runtime hosts the wiremock server.

use actu_admin_cli::client::{role_permits, DirectoryClient, PRIVILEGED_ROLE};
use pretty_assertions::assert_eq;
use tokio::runtime::Runtime;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn rt() -> Runtime {
    Runtime::new().expect("tokio runtime")
}

fn soap_response(inner: &str) -> String {
    format!(
        "<SOAP-ENV:Envelope xmlns:SOAP-ENV=\"http://schemas.xmlsoap.org/soap/envelope/\">\
         <SOAP-ENV:Header/><SOAP-ENV:Body>{inner}</SOAP-ENV:Body></SOAP-ENV:Envelope>"
    )
}

fn login_body() -> String {
    soap_response(
        "<ns2:loginResponse xmlns:ns2=\"http://actu.com/users\">\
         <ns2:token>T1</ns2:token><ns2:username>admin</ns2:username>\
         <ns2:role>ADMIN</ns2:role></ns2:loginResponse>",
    )
}

/// Mount a mock answering every POST to /ws whose body mentions the given
/// operation request element.
fn mount_operation(rt: &Runtime, server: &MockServer, operation: &str, response: ResponseTemplate) {
    rt.block_on(
        Mock::given(method("POST"))
            .and(path("/ws"))
            .and(body_string_contains(format!("{operation}Request")))
            .respond_with(response)
            .mount(server),
    );
}

fn start_server(rt: &Runtime) -> MockServer {
    rt.block_on(MockServer::start())
}

/// Client that already holds the T1 session from a mocked login.
fn authenticated_client(rt: &Runtime, server: &MockServer) -> DirectoryClient {
    mount_operation(
        rt,
        server,
        "login",
        ResponseTemplate::new(200).set_body_string(login_body()),
    );
    let mut client = DirectoryClient::new(server.uri()).unwrap();
    client.authenticate("admin", "pw").unwrap();
    client
}

#[test]
fn authenticate_stores_token_and_role() {
    let rt = rt();
    let server = start_server(&rt);
    let client = authenticated_client(&rt, &server);

    assert!(client.session().is_authenticated());
    assert_eq!(client.session().token(), Some("T1"));
    assert_eq!(client.session().role(), Some(PRIVILEGED_ROLE));
    assert!(role_permits(client.session().role()));
}

#[test]
fn authenticate_without_user_info_leaves_session_unset() {
    let rt = rt();
    let server = start_server(&rt);
    let body = soap_response(
        "<ns2:loginResponse xmlns:ns2=\"http://actu.com/users\">\
         <ns2:token>T1</ns2:token></ns2:loginResponse>",
    );
    mount_operation(&rt, &server, "login", ResponseTemplate::new(200).set_body_string(body));

    let mut client = DirectoryClient::new(server.uri()).unwrap();
    assert!(client.authenticate("admin", "pw").is_err());
    assert!(!client.session().is_authenticated());
    assert_eq!(client.session().role(), None);
}

#[test]
fn authenticate_rejected_by_server_is_failure() {
    let rt = rt();
    let server = start_server(&rt);
    mount_operation(&rt, &server, "login", ResponseTemplate::new(401));

    let mut client = DirectoryClient::new(server.uri()).unwrap();
    assert!(client.authenticate("admin", "bad").is_err());
    assert!(!client.session().is_authenticated());
}

#[test]
fn non_privileged_role_is_denied_by_the_gate() {
    let rt = rt();
    let server = start_server(&rt);
    let body = soap_response(
        "<ns2:loginResponse xmlns:ns2=\"http://actu.com/users\">\
         <ns2:token>T2</ns2:token><ns2:username>eve</ns2:username>\
         <ns2:role>EDITOR</ns2:role></ns2:loginResponse>",
    );
    mount_operation(&rt, &server, "login", ResponseTemplate::new(200).set_body_string(body));

    let mut client = DirectoryClient::new(server.uri()).unwrap();
    client.authenticate("eve", "pw").unwrap();
    assert_eq!(client.session().role(), Some("EDITOR"));
    assert!(!role_permits(client.session().role()));
}

#[test]
fn missing_role_claim_is_denied_by_the_gate() {
    assert!(!role_permits(None));
    let client = DirectoryClient::new("http://127.0.0.1:1").unwrap();
    assert!(!role_permits(client.session().role()));
}

#[test]
fn operations_without_token_make_no_request() {
    let rt = rt();
    let server = start_server(&rt);
    rt.block_on(
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(soap_response("")))
            .mount(&server),
    );

    let client = DirectoryClient::new(server.uri()).unwrap();
    assert!(client.list_users().is_err());
    assert!(client.list_tokens().is_err());
    assert!(client.delete_user(1).is_err());
    assert!(client.generate_token(1).is_err());
    assert!(client.revoke_token(1).is_err());

    let requests = rt.block_on(server.received_requests()).unwrap();
    assert!(requests.is_empty(), "no network call may happen without a token");
}

#[test]
fn list_users_decodes_two_records() {
    let rt = rt();
    let server = start_server(&rt);
    let client = authenticated_client(&rt, &server);

    let body = soap_response(
        "<ns2:getAllUsersResponse xmlns:ns2=\"http://actu.com/users\">\
         <ns2:user><ns2:id>1</ns2:id><ns2:username>alice</ns2:username>\
         <ns2:email>a@x.io</ns2:email><ns2:role>ADMIN</ns2:role></ns2:user>\
         <ns2:user><ns2:id>2</ns2:id><ns2:username>bob</ns2:username>\
         <ns2:email>b@x.io</ns2:email><ns2:role>VISITOR</ns2:role></ns2:user>\
         </ns2:getAllUsersResponse>",
    );
    mount_operation(&rt, &server, "getAllUsers", ResponseTemplate::new(200).set_body_string(body));

    let users = client.list_users().unwrap();
    assert_eq!(users.len(), 2);
    for user in &users {
        let keys: Vec<&str> = user.fields().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["email", "id", "role", "username"]);
    }
    assert_eq!(users[0].get("username"), "alice");
    assert_eq!(users[1].get("role"), "VISITOR");
    assert_eq!(users[1].get("missing"), "N/A");
}

#[test]
fn empty_list_response_is_an_empty_sequence() {
    let rt = rt();
    let server = start_server(&rt);
    let client = authenticated_client(&rt, &server);

    let body = soap_response(
        "<ns2:getAllTokensResponse xmlns:ns2=\"http://actu.com/users\"/>",
    );
    mount_operation(&rt, &server, "getAllTokens", ResponseTemplate::new(200).set_body_string(body));

    assert!(client.list_tokens().unwrap().is_empty());
}

#[test]
fn generate_token_round_trips_child_names_as_keys() {
    let rt = rt();
    let server = start_server(&rt);
    let client = authenticated_client(&rt, &server);

    let body = soap_response(
        "<ns2:generateTokenResponse xmlns:ns2=\"http://actu.com/users\">\
         <ns2:token><ns2:expiresAt>2026-01-01T00:00:00</ns2:expiresAt>\
         <ns2:id>9</ns2:id><ns2:revoked>false</ns2:revoked>\
         <ns2:userId>3</ns2:userId>\
         <ns2:createdAt>2025-01-01T00:00:00</ns2:createdAt></ns2:token>\
         </ns2:generateTokenResponse>",
    );
    mount_operation(&rt, &server, "generateToken", ResponseTemplate::new(200).set_body_string(body));

    let token = client.generate_token(3).unwrap();
    let keys: Vec<&str> = token.fields().keys().map(String::as_str).collect();
    // Key set matches the child local names, independent of response order.
    assert_eq!(keys, vec!["createdAt", "expiresAt", "id", "revoked", "userId"]);
    assert_eq!(token.get("id"), "9");
    assert_eq!(token.get("revoked"), "false");
}

#[test]
fn error_status_is_failure_and_session_survives() {
    let rt = rt();
    let server = start_server(&rt);
    let client = authenticated_client(&rt, &server);

    mount_operation(&rt, &server, "getAllUsers", ResponseTemplate::new(500));
    mount_operation(&rt, &server, "deleteUser", ResponseTemplate::new(403));

    let err = client.list_users().unwrap_err();
    assert!(err.to_string().contains("500"));
    assert!(client.delete_user(1).is_err());
    assert_eq!(client.session().token(), Some("T1"));
}

#[test]
fn malformed_response_body_is_failure() {
    let rt = rt();
    let server = start_server(&rt);
    let client = authenticated_client(&rt, &server);

    mount_operation(
        &rt,
        &server,
        "getAllUsers",
        ResponseTemplate::new(200).set_body_string("<user><id>1</id>"),
    );

    assert!(client.list_users().is_err());
    assert_eq!(client.session().token(), Some("T1"));
}

#[test]
fn status_only_operations_succeed_on_200() {
    let rt = rt();
    let server = start_server(&rt);
    let client = authenticated_client(&rt, &server);

    for op in ["createUser", "updateUser", "deleteUser", "deleteToken", "reactivateToken", "revokeToken"] {
        mount_operation(&rt, &server, op, ResponseTemplate::new(200).set_body_string(soap_response("")));
    }

    client.create_user("carol", "c@x.io", "pw", "EDITOR").unwrap();
    client.update_user(4, "unchanged", "c2@x.io", "unchanged", "unchanged").unwrap();
    client.delete_user(4).unwrap();
    client.delete_token(8).unwrap();
    client.reactivate_token(8).unwrap();
    client.revoke_token(8).unwrap();
}

#[test]
fn blank_role_update_sends_the_lowercase_sentinel() {
    let rt = rt();
    let server = start_server(&rt);
    let client = authenticated_client(&rt, &server);

    rt.block_on(
        Mock::given(method("POST"))
            .and(path("/ws"))
            .and(body_string_contains("updateUserRequest"))
            .and(body_string_contains("<usr:role>unchanged</usr:role>"))
            .respond_with(ResponseTemplate::new(200).set_body_string(soap_response("")))
            .expect(1)
            .mount(&server),
    );

    client
        .update_user(7, "unchanged", "e@x.io", "unchanged", "unchanged")
        .unwrap();
}

#[test]
fn authenticated_request_carries_bearer_header_block() {
    let rt = rt();
    let server = start_server(&rt);
    let client = authenticated_client(&rt, &server);

    rt.block_on(
        Mock::given(method("POST"))
            .and(path("/ws"))
            .and(body_string_contains("deleteTokenRequest"))
            .and(body_string_contains("<sec:Authorization>Bearer T1</sec:Authorization>"))
            .respond_with(ResponseTemplate::new(200).set_body_string(soap_response("")))
            .expect(1)
            .mount(&server),
    );

    client.delete_token(5).unwrap();
}

#[test]
fn transport_failure_is_failure_not_panic() {
    // Nothing listens on this port; the connection is refused.
    let mut client = DirectoryClient::new("http://127.0.0.1:1").unwrap();
    assert!(client.authenticate("admin", "pw").is_err());
    assert!(!client.session().is_authenticated());
}
